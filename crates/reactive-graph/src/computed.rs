//! `Computed<T>`: a lazily-evaluated, memoized derived value.
//!
//! Unlike an effect, a computed's body is not run eagerly when one of its dependencies changes.
//! A write only marks it (and everything downstream of it) dirty; the body re-runs the next time
//! someone actually reads it, via [`Computed::get`]/[`Computed::get_clone`]. This matches the
//! grounding corpus's `create_memo` API surface, but not its eager evaluation strategy — see
//! `SPEC_FULL.md` §4.7 for why laziness is required here.

use std::any::Any;
use std::cell::Ref;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{GraphError, GraphResult};
use crate::node::{NodeId, NodeKind, NodeState};
use crate::root::Root;
use crate::utils::same_value;

/// A read-only, memoized derived value. Cheap to copy; identity is the underlying [`NodeId`].
pub struct Computed<T> {
    id: NodeId,
    root: &'static Root,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Computed<T> {}

impl<T: 'static> Computed<T> {
    /// Re-runs the body if dirty. Returns [`GraphError::CyclicComputation`] if this computed is
    /// reentered while already being evaluated, without disturbing its previous value.
    fn ensure_fresh(&self) -> GraphResult<()> {
        let state = {
            let nodes = self.root.nodes.borrow();
            let Some(node) = nodes.get(self.id) else {
                panic!("computed has already been disposed");
            };
            node.state
        };
        match state {
            NodeState::Checking => Err(GraphError::CyclicComputation),
            NodeState::Dirty => {
                self.root.run_node_update(self.id);
                Ok(())
            }
            NodeState::Clean => Ok(()),
        }
    }

    fn get_ref(&self) -> Ref<'_, T> {
        let nodes = self.root.nodes.borrow();
        Ref::map(nodes, |nodes| {
            nodes[self.id]
                .value
                .as_ref()
                .unwrap()
                .downcast_ref::<Option<T>>()
                .expect("computed value type mismatch")
                .as_ref()
                .expect("computed read before its first evaluation")
        })
    }

    fn track(&self) {
        if let Some(tracker) = self.root.tracker.borrow_mut().as_mut() {
            tracker.track(self.id);
        }
    }

    /// Returns `true` if the computed's underlying node has not been disposed.
    pub fn is_alive(&self) -> bool {
        self.root.nodes.borrow().contains_key(self.id)
    }

    pub fn dispose(self) {
        self.id.dispose();
    }

    /// Fallible read that surfaces [`GraphError::CyclicComputation`] instead of panicking.
    pub fn try_get_clone(&self) -> GraphResult<T>
    where
        T: Clone,
    {
        self.ensure_fresh()?;
        self.track();
        Ok(self.get_ref().clone())
    }

    /// Track, re-evaluate if dirty, then clone the value. Panics on a cyclic computation.
    pub fn get_clone(&self) -> T
    where
        T: Clone,
    {
        self.try_get_clone().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Track, re-evaluate if dirty, then read the value. Requires `T: Copy`.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        self.get_clone()
    }

    /// Run `f` with a reference to the (fresh) value, without tracking.
    pub fn with_untracked<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.ensure_fresh().unwrap_or_else(|e| panic!("{e}"));
        f(&self.get_ref())
    }

    /// Track, then run `f` with a reference to the (fresh) value.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        self.ensure_fresh().unwrap_or_else(|e| panic!("{e}"));
        self.track();
        f(&self.get_ref())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|v| v.fmt(f))
    }
}

fn new_computed_node<T: PartialEq + 'static>(
    mut f: impl FnMut() -> T + 'static,
) -> NodeId {
    let root = Root::global();
    let callback: Box<dyn FnMut(&mut Box<dyn Any>) -> bool> = Box::new(move |value| {
        let new = f();
        let slot: &mut Option<T> = value.downcast_mut().expect("computed value type mismatch");
        let changed = match slot.as_ref() {
            Some(old) => !same_value(old, &new),
            None => true,
        };
        *slot = Some(new);
        changed
    });
    let id = root.create_node(NodeKind::Computed, Box::new(None::<T>), Some(callback));
    root.nodes.borrow_mut()[id].state = NodeState::Dirty;
    id
}

/// Creates a memoized derived value from `f`. `f` re-runs, lazily, the next time the memo is read
/// after one of its dependencies changed. The new value replaces the old only if it differs under
/// [`same_value`] (`Object.is`-flavored) equality; an unchanged result does not dirty downstream.
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_memo<T: PartialEq + 'static>(f: impl FnMut() -> T + 'static) -> Computed<T> {
    let root = Root::global();
    let id = new_computed_node(f);
    Computed { id, root, _phantom: PhantomData }
}

/// Like [`create_memo`], but compares successive values with `eq` instead of [`same_value`].
/// Mirrors the grounding corpus's `create_selector_with`.
pub fn create_selector_with<T: 'static>(
    mut f: impl FnMut() -> T + 'static,
    eq: impl Fn(&T, &T) -> bool + 'static,
) -> Computed<T> {
    let root = Root::global();
    let callback: Box<dyn FnMut(&mut Box<dyn Any>) -> bool> = Box::new(move |value| {
        let new = f();
        let slot: &mut Option<T> = value.downcast_mut().expect("computed value type mismatch");
        let changed = match slot.as_ref() {
            Some(old) => !eq(old, &new),
            None => true,
        };
        *slot = Some(new);
        changed
    });
    let id = root.create_node(NodeKind::Computed, Box::new(None::<T>), Some(callback));
    root.nodes.borrow_mut()[id].state = NodeState::Dirty;
    Computed { id, root, _phantom: PhantomData }
}

/// [`create_selector_with`] using `PartialEq` for comparison.
pub fn create_selector<T: PartialEq + 'static>(f: impl FnMut() -> T + 'static) -> Computed<T> {
    create_selector_with(f, |a, b| a == b)
}

#[cfg(test)]
mod tests {
    use crate::root::{create_root, untrack};
    use crate::scheduler::flush_sync;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn memo_is_lazy_until_read() {
        let _ = create_root(|| {
            let runs = create_signal(0);
            let state = create_signal(1);
            let memo = create_memo(move || {
                runs.update_silent(|r| *r += 1);
                state.get() * 2
            });
            // Not read yet: first eval happens on first `.get()`.
            assert_eq!(runs.get_untracked(), 0);
            assert_eq!(memo.get(), 2);
            assert_eq!(runs.get_untracked(), 1);

            state.set(2);
            // Dirtied but not re-evaluated until read.
            assert_eq!(runs.get_untracked(), 1);
            assert_eq!(memo.get(), 4);
            assert_eq!(runs.get_untracked(), 2);
        });
    }

    #[test]
    fn memo_only_recomputes_on_change() {
        let _ = create_root(|| {
            let runs = create_signal(0);
            let state = create_signal(1);
            let memo = create_memo(move || {
                runs.update_silent(|r| *r += 1);
                state.get()
            });
            assert_eq!(memo.get(), 1);
            assert_eq!(runs.get_untracked(), 1);

            state.set(1); // same_value: no-op, memo stays clean.
            assert_eq!(memo.get(), 1);
            assert_eq!(runs.get_untracked(), 1);
        });
    }

    #[test]
    fn dependency_on_memo() {
        let _ = create_root(|| {
            let state = create_signal(1);
            let double = create_memo(move || state.get() * 2);
            let quadruple = create_memo(move || double.get() * 2);
            assert_eq!(quadruple.get(), 4);
            state.set(2);
            assert_eq!(quadruple.get(), 8);
        });
    }

    #[test]
    fn untracked_memo_read_does_not_subscribe() {
        let _ = create_root(|| {
            let state = create_signal(1);
            let effect_runs = create_signal(0);
            let memo = create_memo(move || state.get());
            crate::effect::create_effect(move || {
                effect_runs.update_silent(|r| *r += 1);
                untrack(|| {
                    let _ = memo.get();
                });
            });
            flush_sync();
            assert_eq!(effect_runs.get_untracked(), 1);
            state.set(2);
            flush_sync();
            assert_eq!(effect_runs.get_untracked(), 1);
        });
    }

    #[test]
    fn selector_uses_custom_equality() {
        let _ = create_root(|| {
            let state = create_signal(1);
            let runs = create_signal(0);
            let selector = create_selector_with(
                move || {
                    runs.update_silent(|r| *r += 1);
                    state.get()
                },
                |a: &i32, b: &i32| a.rem_euclid(2) == b.rem_euclid(2),
            );
            assert_eq!(selector.get(), 1);
            state.set(3); // same parity: selector's *value* changes to 3, but downstream sees "same".
            assert_eq!(selector.get(), 3);
            assert_eq!(runs.get_untracked(), 2);
        });
    }
}
