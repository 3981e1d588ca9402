//! `Store<T>`: a reactive container for nested data, read and written as a whole.
//!
//! The grounding corpus's `Store<T>` relies on a derive macro (`#[derive(State)]`) that generates
//! a per-field trigger struct for fine-grained field-level reactivity; that macro crate is a
//! template/codegen concern out of scope here (see `SPEC_FULL.md` §3.1). This `Store<T>` instead
//! wraps the whole value in a single node, same as [`crate::signal::Signal`] but with no
//! `same_value` short-circuit on write — any [`Store::update`] is assumed to have changed
//! something nested and unconditionally notifies. Reads and writes are always whole-object.
//!
//! `Store<T>` owns its value outright. For a target shared by `Rc` with identity-cached wrapping,
//! raw-marking, and a readonly view, see [`crate::reactive::Reactive`] instead.

use crate::signal::{ReadSignal, Signal};

/// A reactive container for nested/structured data.
#[derive(Clone, Copy)]
pub struct Store<T>(Signal<T>);

/// Creates a new store holding `value`.
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_store<T: 'static>(value: T) -> Store<T> {
    Store(crate::signal::create_signal(value))
}

impl<T: 'static> Store<T> {
    /// The read-only half of this store.
    pub fn read(&self) -> ReadSignal<T> {
        self.0 .0
    }

    /// Track, then run `f` with a reference to the whole value.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.with(f)
    }

    /// Run `f` with a reference to the whole value, without tracking.
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.with_untracked(f)
    }

    /// Track, then clone the whole value.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        self.0.get_clone()
    }

    /// Mutate the value in place and unconditionally notify every dependent — a store never
    /// short-circuits on equality, since the mutation may only touch one nested field.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.0.update(f);
    }

    /// Replace the whole value, unconditionally notifying dependents.
    pub fn set(&self, value: T) {
        self.0.replace(value);
    }
}

#[cfg(test)]
mod tests {
    use crate::root::create_root;
    use crate::scheduler::flush_sync;

    use super::*;

    struct Foo {
        value: i32,
        label: String,
    }

    #[test]
    fn update_notifies_effects_on_the_whole_store() {
        let _ = create_root(|| {
            let foo = create_store(Foo { value: 123, label: "a".into() });
            let runs = crate::signal::create_signal(0);
            crate::effect::create_effect(move || {
                foo.with(|_| {});
                runs.update_silent(|r| *r += 1);
            });
            assert_eq!(runs.get_untracked(), 1);

            foo.update(|f| f.value = 456);
            assert_eq!(runs.get_untracked(), 2);
            assert_eq!(foo.with_untracked(|f| f.value), 456);

            foo.update(|f| f.label = "b".into());
            flush_sync();
            assert_eq!(runs.get_untracked(), 3);
        });
    }
}
