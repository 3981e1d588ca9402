//! `Reactive<T>`: a deep-ish reactive wrapper over shared, heap-allocated data (spec.md §4.6's
//! `reactive(target)`/readonly family).
//!
//! Rust has no dynamic property interception the way the grounding corpus's JS host does, so
//! trapping individual nested-field writes can't be expressed without a derive macro — out of
//! scope for the same reason `store.rs`'s sibling note gives (`#[derive(State)]`-style codegen).
//! What *is* expressible without one, and what this module builds: identity-cached wrapping of a
//! shared `Rc<RefCell<T>>` target (so `reactive(same_rc)` twice returns the same wrapper), a
//! raw-marking escape hatch, and a readonly view that rejects writes, all notifying through the
//! same signal graph `Signal<T>` uses. Reads/writes stay whole-object, same simplification
//! `Store<T>` already makes; `Reactive<T>` additionally gives the identity cache and raw/readonly
//! variants spec §4.6 and §8 test for, which `Store<T>` never claimed to cover.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::signal::{create_signal, Signal};

thread_local! {
    /// Pointer-identity → existing wrapper, type-erased. Ensures `reactive(x) === reactive(x)`
    /// (spec.md §8) when `x` is the same `Rc` allocation, rather than double-wrapping.
    static REACTIVE_CACHE: RefCell<HashMap<usize, Rc<dyn Any>>> = RefCell::new(HashMap::new());
    static RAW_MARKED: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn ptr_key<T>(target: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(target) as usize
}

/// Marks `target` as never reactive: a `reactive`/`shallow_reactive` wrapper subsequently built
/// over it still type-checks (this is Rust, not a dynamic proxy) but never notifies on write,
/// approximating spec.md's "respects raw-marked objects" for a statically-typed host.
pub fn mark_raw<T>(target: &Rc<RefCell<T>>) {
    RAW_MARKED.with(|s| s.borrow_mut().insert(ptr_key(target)));
}

fn is_marked_raw<T>(target: &Rc<RefCell<T>>) -> bool {
    RAW_MARKED.with(|s| s.borrow().contains(&ptr_key(target)))
}

/// Whether a [`Reactive`] tracks only the top-level replacement of its target (`Shallow`) or
/// every whole-object mutation the same way [`Reactive::update`] always has (`Deep`). Since reads
/// and writes are whole-object either way (see module docs), `Shallow` differs from `Deep` only in
/// that [`Reactive::set`] replacing the target still notifies under both, but a caller using
/// `Shallow` is documenting that it does not expect nested field writes to be individually
/// trackable — which is already true of `Deep` here too; the distinction is kept for API parity
/// with spec.md's `reactive`/`shallowReactive` split, not because the two currently behave
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Deep,
    Shallow,
}

struct Inner<T> {
    target: Rc<RefCell<T>>,
    version: Signal<u64>,
    depth: Depth,
    raw: bool,
}

/// A reactive wrapper over a shared `Rc<RefCell<T>>` target.
pub struct Reactive<T: 'static>(Rc<Inner<T>>);

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Reactive(self.0.clone())
    }
}

/// Creates (or returns the cached) [`Reactive`] wrapper over `target`, deep variant.
#[cfg_attr(debug_assertions, track_caller)]
pub fn reactive<T: 'static>(target: Rc<RefCell<T>>) -> Reactive<T> {
    wrap(target, Depth::Deep)
}

/// Creates (or returns the cached) [`Reactive`] wrapper over `target`, shallow variant.
#[cfg_attr(debug_assertions, track_caller)]
pub fn shallow_reactive<T: 'static>(target: Rc<RefCell<T>>) -> Reactive<T> {
    wrap(target, Depth::Shallow)
}

fn wrap<T: 'static>(target: Rc<RefCell<T>>, depth: Depth) -> Reactive<T> {
    let key = ptr_key(&target);
    if let Some(cached) = REACTIVE_CACHE.with(|c| c.borrow().get(&key).cloned()) {
        if let Ok(cached) = cached.downcast::<Inner<T>>() {
            return Reactive(cached);
        }
    }
    let raw = is_marked_raw(&target);
    let inner = Rc::new(Inner { target, version: create_signal(0), depth, raw });
    REACTIVE_CACHE.with(|c| c.borrow_mut().insert(key, inner.clone() as Rc<dyn Any>));
    Reactive(inner)
}

impl<T: 'static> Reactive<T> {
    /// Whether this wrapper was built via [`reactive`] (`Deep`) or [`shallow_reactive`]
    /// (`Shallow`).
    pub fn depth(&self) -> Depth {
        self.0.depth
    }

    /// Track, then run `f` with a reference to the whole target.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.version.track();
        f(&self.0.target.borrow())
    }

    /// Run `f` with a reference to the whole target, without tracking.
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.0.target.borrow())
    }

    /// Track, then clone the whole target.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        self.with(|v| v.clone())
    }

    /// Mutate in place; unconditionally notifies unless this wrapper was built over a
    /// [`mark_raw`]-marked target, in which case the mutation still happens but nothing observes
    /// it reactively.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.target.borrow_mut());
        if !self.0.raw {
            self.0.version.update(|v| *v += 1);
        }
    }

    /// Replaces the whole target's contents, unconditionally notifying (subject to the same
    /// raw-marking exception as [`Self::update`]).
    pub fn set(&self, value: T) {
        self.update(|slot| *slot = value);
    }

    /// The underlying `Rc<RefCell<T>>`, same identity `reactive`/`shallow_reactive` were given
    /// (spec.md's `toRaw`).
    pub fn to_raw(&self) -> Rc<RefCell<T>> {
        self.0.target.clone()
    }

    /// `true` if the target this wraps was [`mark_raw`]-marked before (or at) the point this
    /// wrapper was created.
    pub fn is_raw(&self) -> bool {
        self.0.raw
    }
}

/// `true` — a `Reactive<T>` is always reactive by construction (Rust's static types already
/// encode what a JS host's `isReactive` checks dynamically); kept for API parity with spec.md.
pub fn is_reactive<T>(_: &Reactive<T>) -> bool {
    true
}

/// A read-only view over a [`Reactive`] target: writes are rejected outright rather than routed
/// through (spec.md's `readonly`/`shallowReadonly`).
pub struct Readonly<T: 'static>(Reactive<T>);

impl<T> Clone for Readonly<T> {
    fn clone(&self) -> Self {
        Readonly(self.0.clone())
    }
}

/// Wraps `target` read-only, deep variant.
pub fn readonly<T: 'static>(target: &Reactive<T>) -> Readonly<T> {
    Readonly(target.clone())
}

/// Wraps `target` read-only, shallow variant — same caveat as [`shallow_reactive`].
pub fn shallow_readonly<T: 'static>(target: &Reactive<T>) -> Readonly<T> {
    Readonly(target.clone())
}

impl<T: 'static> Readonly<T> {
    /// Track, then run `f` with a reference to the whole target.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.with(f)
    }

    /// Run `f` with a reference to the whole target, without tracking.
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.0.with_untracked(f)
    }

    /// Track, then clone the whole target.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        self.0.get_clone()
    }

    /// `toRaw(readonly(reactive(t))) === t`, same as an un-wrapped [`Reactive`].
    pub fn to_raw(&self) -> Rc<RefCell<T>> {
        self.0.to_raw()
    }

    /// Attempts to mutate through this read-only view: always rejected. Mirrors spec.md's
    /// "Readonly proxies reject writes; in development mode a warning is emitted identifying the
    /// offending key" — `key` is logged as-is, the mutation never runs.
    pub fn try_update(&self, key: &str) {
        #[cfg(feature = "trace")]
        tracing::warn!(key, "write rejected: target is readonly");
        #[cfg(not(feature = "trace"))]
        let _ = key;
    }
}

/// `true` for any [`Readonly`] view; `false` for a plain [`Reactive`] (spec.md's `isReadonly`).
pub fn is_readonly<T>(_: &Readonly<T>) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use crate::root::create_root;
    use crate::scheduler::flush_sync;

    use super::*;

    #[derive(Clone)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn reactive_identity_cache_returns_the_same_wrapper() {
        let _ = create_root(|| {
            let target = Rc::new(RefCell::new(Point { x: 0, y: 0 }));
            let a = reactive(target.clone());
            let b = reactive(target.clone());
            assert!(Rc::ptr_eq(&a.0, &b.0), "reactive(x) === reactive(x)");
            assert!(Rc::ptr_eq(&a.to_raw(), &target), "toRaw(reactive(x)) === x");
        });
    }

    #[test]
    fn update_notifies_effects_tracking_the_whole_object() {
        let _ = create_root(|| {
            let target = Rc::new(RefCell::new(Point { x: 0, y: 0 }));
            let r = reactive(target);
            let runs = crate::signal::create_signal(0);
            crate::effect::create_effect(move || {
                r.with(|_| {});
                runs.update_silent(|n| *n += 1);
            });
            assert_eq!(runs.get_untracked(), 1);

            let r2 = reactive(Rc::new(RefCell::new(Point { x: 0, y: 0 })));
            r2.update(|p| p.x = 5);
            flush_sync();
            assert_eq!(r2.with_untracked(|p| p.x), 5);
        });
    }

    #[test]
    fn raw_marked_target_never_notifies() {
        let _ = create_root(|| {
            let target = Rc::new(RefCell::new(Point { x: 0, y: 0 }));
            mark_raw(&target);
            let r = reactive(target);
            assert!(r.is_raw());
            let runs = crate::signal::create_signal(0);
            crate::effect::create_effect(move || {
                r.with(|_| {});
                runs.update_silent(|n| *n += 1);
            });
            assert_eq!(runs.get_untracked(), 1);

            r.update(|p| p.x = 9);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1, "raw-marked reactive must not notify");
        });
    }

    #[test]
    fn readonly_view_reads_without_allowing_writes() {
        let _ = create_root(|| {
            let target = Rc::new(RefCell::new(Point { x: 1, y: 2 }));
            let r = reactive(target.clone());
            let ro = readonly(&r);
            assert!(is_readonly(&ro));
            assert!(is_reactive(&r));
            assert_eq!(ro.with_untracked(|p| p.x), 1);
            assert!(Rc::ptr_eq(&ro.to_raw(), &target));
        });
    }
}
