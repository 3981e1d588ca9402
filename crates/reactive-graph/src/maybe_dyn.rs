//! A value that can be either static or reactive.

use std::borrow::Cow;
use std::rc::Rc;

use crate::computed::Computed;
use crate::signal::{ReadSignal, Signal};

/// Represents a value that can be either static or dynamic.
///
/// Useful for places that want to accept either a plain value or something reactive, such as
/// component props. A [`MaybeDyn`] value can be created from a static value, a [`ReadSignal`]/
/// [`Signal`]/[`Computed`], or a closure that returns the value, via the [`From`] trait.
///
/// There's no specialization in stable Rust to implement `Into<MaybeDyn<T>>` generically for
/// every `T`; [`impl_into_maybe_dyn!`] generates the per-type boilerplate.
#[derive(Clone)]
pub enum MaybeDyn<T>
where
    T: Into<Self> + 'static,
{
    /// A static value.
    Static(T),
    /// A dynamic value backed by a signal or computed.
    Signal(ReadSignal<T>),
    /// A derived dynamic value, recomputed on every read.
    Derived(Rc<dyn Fn() -> Self>),
}

impl<T: Into<Self> + 'static> MaybeDyn<T> {
    /// Get the value by consuming itself. Unlike [`get_clone`](Self::get_clone), this avoids a
    /// clone if the value is static.
    pub fn evaluate(self) -> T
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => value,
            Self::Signal(signal) => signal.get_clone(),
            Self::Derived(f) => f().evaluate(),
        }
    }

    /// Get the value by copying it.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        match self {
            Self::Static(value) => *value,
            Self::Signal(value) => value.get(),
            Self::Derived(f) => f().evaluate(),
        }
    }

    /// Get the value by cloning it.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => value.clone(),
            Self::Signal(value) => value.get_clone(),
            Self::Derived(f) => f().evaluate(),
        }
    }

    /// Track the reactive dependencies, if dynamic.
    pub fn track(&self) {
        match self {
            Self::Static(_) => {}
            Self::Signal(signal) => signal.track(),
            Self::Derived(f) => f().track(),
        }
    }

    /// Returns the value if static, or `None` if dynamic.
    pub fn as_static(&self) -> Option<&T> {
        match self {
            Self::Static(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Into<Self>> From<ReadSignal<T>> for MaybeDyn<T> {
    fn from(val: ReadSignal<T>) -> Self {
        MaybeDyn::Signal(val)
    }
}

impl<T: Into<Self>> From<Signal<T>> for MaybeDyn<T> {
    fn from(val: Signal<T>) -> Self {
        MaybeDyn::Signal(*val)
    }
}

impl<T: Into<Self> + Clone> From<Computed<T>> for MaybeDyn<T> {
    fn from(val: Computed<T>) -> Self {
        MaybeDyn::Derived(Rc::new(move || val.get_clone().into()))
    }
}

impl<F, U, T: Into<Self>> From<F> for MaybeDyn<T>
where
    F: Fn() -> U + 'static,
    U: Into<MaybeDyn<T>>,
{
    fn from(f: F) -> Self {
        MaybeDyn::Derived(Rc::new(move || f().into()))
    }
}

/// Generates `Into<MaybeDyn<T>>` implementations for a type (and, optionally, other types that
/// convert statically into it). Rust's orphan rules mean this only works for types defined in
/// this crate or a downstream crate using a newtype.
#[macro_export]
macro_rules! impl_into_maybe_dyn {
    ($ty:ty $(; $($from:ty),*)?) => {
        impl From<$ty> for $crate::MaybeDyn<$ty> {
            fn from(val: $ty) -> Self {
                $crate::MaybeDyn::Static(val)
            }
        }

        $(
            $(
                impl From<$from> for $crate::MaybeDyn<$ty> {
                    fn from(val: $from) -> Self {
                        $crate::MaybeDyn::Static(val.into())
                    }
                }
            )*
        )?
    };
}

impl_into_maybe_dyn!(bool);
impl_into_maybe_dyn!(Cow<'static, str>; &'static str, String);

impl_into_maybe_dyn!(f32);
impl_into_maybe_dyn!(f64);

impl_into_maybe_dyn!(i8);
impl_into_maybe_dyn!(i16);
impl_into_maybe_dyn!(i32);
impl_into_maybe_dyn!(i64);
impl_into_maybe_dyn!(i128);
impl_into_maybe_dyn!(isize);
impl_into_maybe_dyn!(u8);
impl_into_maybe_dyn!(u16);
impl_into_maybe_dyn!(u32);
impl_into_maybe_dyn!(u64);
impl_into_maybe_dyn!(u128);
impl_into_maybe_dyn!(usize);

impl<T> From<Vec<T>> for MaybeDyn<Vec<T>> {
    fn from(val: Vec<T>) -> Self {
        MaybeDyn::Static(val)
    }
}

#[cfg(test)]
mod tests {
    use crate::root::create_root;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn static_value_does_not_track() {
        let _ = create_root(|| {
            let md: MaybeDyn<i32> = 5.into();
            assert_eq!(md.get(), 5);
            assert_eq!(md.as_static(), Some(&5));
        });
    }

    #[test]
    fn signal_backed_value_tracks() {
        let _ = create_root(|| {
            let signal = create_signal(1);
            let md: MaybeDyn<i32> = signal.into();
            assert_eq!(md.get(), 1);
            signal.set(2);
            assert_eq!(md.get(), 2);
            assert_eq!(md.as_static(), None);
        });
    }

    #[test]
    fn closure_backed_value_is_derived() {
        let _ = create_root(|| {
            let signal = create_signal(10);
            let md: MaybeDyn<i32> = (move || signal.get() * 2).into();
            assert_eq!(md.get(), 20);
            signal.set(11);
            assert_eq!(md.get(), 22);
        });
    }
}
