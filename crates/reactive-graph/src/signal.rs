//! `ValueRef`: the single-cell signal keyed by `"value"` (spec's `ref`/`shallowRef`).

use std::cell::{Ref, RefMut};
use std::fmt;
use std::marker::PhantomData;

use crate::node::{NodeId, NodeKind};
use crate::root::Root;
use crate::utils::same_value;

#[cfg(debug_assertions)]
fn created_at() -> &'static std::panic::Location<'static> {
    std::panic::Location::caller()
}

/// The read half of a [`ValueRef`]. Cheap to copy; identity is the underlying [`NodeId`].
pub struct ReadSignal<T> {
    pub(crate) id: NodeId,
    pub(crate) root: &'static Root,
    #[cfg(debug_assertions)]
    pub(crate) created_at: &'static std::panic::Location<'static>,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for ReadSignal<T> {}

fn disposed_message(#[allow(unused)] loc: Option<&'static std::panic::Location<'static>>) -> String {
    #[cfg(debug_assertions)]
    if let Some(loc) = loc {
        return format!("signal created at {loc} has already been disposed");
    }
    "signal has already been disposed".to_string()
}

impl<T: 'static> ReadSignal<T> {
    fn get_ref(&self) -> Ref<'_, T> {
        let nodes = self.root.nodes.borrow();
        if !nodes.contains_key(self.id) {
            #[cfg(debug_assertions)]
            panic!("{}", disposed_message(Some(self.created_at)));
            #[cfg(not(debug_assertions))]
            panic!("{}", disposed_message(None));
        }
        Ref::map(nodes, |nodes| {
            nodes[self.id]
                .value
                .as_ref()
                .unwrap()
                .downcast_ref()
                .expect("signal value type mismatch")
        })
    }

    fn get_ref_untracked(&self) -> Ref<'_, T> {
        self.get_ref()
    }

    fn get_mut_untracked(&self) -> RefMut<'_, T> {
        let nodes = self.root.nodes.borrow_mut();
        RefMut::map(nodes, |nodes| {
            nodes[self.id]
                .value
                .as_mut()
                .unwrap()
                .downcast_mut()
                .expect("signal value type mismatch")
        })
    }

    /// Returns `true` if the signal has not been disposed.
    pub fn is_alive(&self) -> bool {
        self.root.nodes.borrow().contains_key(self.id)
    }

    /// Disposes the signal's underlying node. Further reads panic.
    pub fn dispose(self) {
        self.id.dispose();
    }

    /// Registers this signal with the currently running tracked scope, if any. Idempotent: a
    /// signal tracked twice in the same frame is only recorded once.
    pub fn track(&self) {
        if let Some(tracker) = self.root.tracker.borrow_mut().as_mut() {
            tracker.track(self.id);
        }
    }

    /// Read the value without tracking. Requires `T: Copy`; see [`Self::get_clone_untracked`]
    /// for non-`Copy` types.
    pub fn get_untracked(&self) -> T
    where
        T: Copy,
    {
        *self.get_ref_untracked()
    }

    /// Clone the value without tracking.
    pub fn get_clone_untracked(&self) -> T
    where
        T: Clone,
    {
        self.get_ref_untracked().clone()
    }

    /// Track, then read the value. Requires `T: Copy`.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        self.track();
        self.get_untracked()
    }

    /// Track, then clone the value.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.get_clone_untracked()
    }

    /// Run `f` with a reference to the value, without tracking.
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.get_ref_untracked())
    }

    /// Track, then run `f` with a reference to the value.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.track();
        self.with_untracked(f)
    }

    /// Create a derived, memoized signal by mapping this signal's value.
    pub fn map<U: 'static>(self, mut f: impl FnMut(&T) -> U + 'static) -> crate::computed::Computed<U> {
        crate::computed::create_memo(move || self.with(|v| f(v)))
    }
}

impl<T: 'static> fmt::Debug for ReadSignal<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|v| v.fmt(f))
    }
}

impl<T: fmt::Display + 'static> fmt::Display for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|v| v.fmt(f))
    }
}

impl<T: PartialEq + 'static> PartialEq for ReadSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.with(|a| other.with(|b| a == b))
    }
}
impl<T: Eq + 'static> Eq for ReadSignal<T> {}

/// A single-cell reactive value: `ValueRef<T>` in the data model, `Signal<T>` in the public API.
/// Writes that compare equal to the current value (via [`same_value`], `Object.is`-flavored) are
/// no-ops: no dependents are marked dirty.
#[derive(Clone, Copy)]
pub struct Signal<T>(pub(crate) ReadSignal<T>);

/// Alias matching `spec.md`'s `ValueRef<T>` name, used by the rest of the workspace.
pub type ValueRef<T> = Signal<T>;

/// Creates a new reactive cell holding `value`.
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_signal<T: 'static>(value: T) -> Signal<T> {
    let root = Root::global();
    let id = root.create_node(NodeKind::Signal, Box::new(value), None);
    Signal(ReadSignal {
        id,
        root,
        #[cfg(debug_assertions)]
        created_at: created_at(),
        _phantom: PhantomData,
    })
}

impl<T: 'static> Signal<T> {
    /// Write `value`, skipping the equality check and never notifying dependents.
    pub fn set_silent(&self, value: T) {
        *self.0.get_mut_untracked() = value;
    }

    /// Write `value`. If it compares equal to the current value, this is a no-op (no
    /// notification). Otherwise, every dependent is marked dirty and (depending on flush mode)
    /// scheduled.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        let changed = {
            let mut nodes = self.0.root.nodes.borrow_mut();
            let slot: &mut T = nodes[self.0.id]
                .value
                .as_mut()
                .unwrap()
                .downcast_mut()
                .unwrap();
            if same_value(slot, &value) {
                false
            } else {
                *slot = value;
                true
            }
        };
        if changed {
            self.0.root.propagate_updates(self.0.id);
        }
    }

    /// Write `value` unconditionally (no equality check) and always notify.
    pub fn set_force(&self, value: T) {
        self.set_silent(value);
        self.0.root.propagate_updates(self.0.id);
    }

    pub fn replace_silent(&self, value: T) -> T {
        std::mem::replace(&mut self.0.get_mut_untracked(), value)
    }

    /// Replaces the value unconditionally (no equality check, always notifies) and returns the
    /// old value.
    pub fn replace(&self, value: T) -> T {
        let old = self.replace_silent(value);
        self.0.root.propagate_updates(self.0.id);
        old
    }

    pub fn take_silent(&self) -> T
    where
        T: Default,
    {
        self.replace_silent(T::default())
    }

    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.replace(T::default())
    }

    pub fn update_silent(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.get_mut_untracked());
    }

    /// Mutates the value in place and unconditionally notifies dependents. Unlike [`Self::set`],
    /// there is no equality short-circuit: `update` doesn't have the pre-mutation value on hand
    /// to compare without requiring `T: Clone`.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.get_mut_untracked());
        self.0.root.propagate_updates(self.0.id);
    }

    pub fn set_fn_silent(&self, f: impl FnOnce(&T) -> T) {
        let new = f(&self.0.get_ref_untracked());
        self.set_silent(new);
    }

    pub fn set_fn(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        let new = f(&self.0.get_ref_untracked());
        self.set(new);
    }

    /// Splits into a read-only view and a setter closure.
    pub fn split(self) -> (ReadSignal<T>, impl Fn(T) + Clone)
    where
        T: PartialEq,
    {
        (self.0, move |v| self.set(v))
    }
}

impl<T> std::ops::Deref for Signal<T> {
    type Target = ReadSignal<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        create_signal(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: fmt::Display + 'static> fmt::Display for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A `Signal<T>` handle, usable outside of any owning scope without going through a `&ReadSignal`
/// borrow. Mirrors the grounding corpus's `RcSignal`, used by the `Dynamic` view variant so a view
/// can hold a signal without that signal needing to live as long as the view itself. Thin wrapper
/// around [`Signal`] rather than a bare `Rc<RefCell<T>>`: reads/writes go through the same node
/// graph as every other signal, so a `SharedValueRef` tracks and notifies exactly like any other
/// [`Signal`] it happens to wrap.
#[derive(Clone, Copy)]
pub struct SharedValueRef<T>(Signal<T>);

impl<T: 'static> SharedValueRef<T> {
    pub fn new(value: T) -> Self {
        Self(create_signal(value))
    }

    /// Track, then clone the value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.get_clone()
    }

    /// Clone the value without tracking.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.get_clone_untracked()
    }

    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        self.0.set(value);
    }

    /// The underlying [`Signal`] this wraps.
    pub fn as_signal(&self) -> Signal<T> {
        self.0
    }
}

/// Unwraps a [`ReadSignal`]/[`Signal`] into its current value, or returns a plain value
/// unchanged. Mirrors spec's `unref`.
pub trait Unref<T> {
    fn unref(self) -> T;
}

impl<T: Copy + 'static> Unref<T> for ReadSignal<T> {
    fn unref(self) -> T {
        self.get()
    }
}
impl<T: Copy + 'static> Unref<T> for Signal<T> {
    fn unref(self) -> T {
        self.0.get()
    }
}

/// `true` — a [`Signal`] is always a signal by construction. Mirrors spec's `isRef`; kept for API
/// parity since there's no dynamic check needed in a statically-typed host.
pub fn is_ref<T>(_: &Signal<T>) -> bool {
    true
}

/// `true` — a [`ReadSignal`] is always a signal by construction. Mirrors spec's `isRef`.
pub fn is_ref_read<T>(_: &ReadSignal<T>) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use crate::effect::create_effect;
    use crate::root::create_root;

    use super::*;

    #[test]
    fn shared_value_ref_tracks_and_notifies_like_any_other_signal() {
        let _ = create_root(|| {
            let shared = SharedValueRef::new(1);
            let runs = create_signal(0);
            let seen = create_signal(0);
            create_effect(move || {
                seen.set_silent(shared.get());
                runs.update_silent(|r| *r += 1);
            });
            assert_eq!(runs.get_untracked(), 1);
            assert_eq!(seen.get_untracked(), 1);

            shared.set(2);
            assert_eq!(runs.get_untracked(), 2);
            assert_eq!(seen.get_untracked(), 2);
        });
    }

    #[test]
    fn shared_value_ref_set_with_equal_value_does_not_notify() {
        let _ = create_root(|| {
            let shared = SharedValueRef::new(1);
            let runs = create_signal(0);
            create_effect(move || {
                shared.get();
                runs.update_silent(|r| *r += 1);
            });
            assert_eq!(runs.get_untracked(), 1);
            shared.set(1);
            assert_eq!(runs.get_untracked(), 1);
        });
    }
}

