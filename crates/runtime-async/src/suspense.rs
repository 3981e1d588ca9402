//! Suspense scopes: tracking how many outstanding async tasks a component subtree is waiting on.
//!
//! Grounded on the corpus's `sycamore-futures::suspense` module, re-plumbed onto
//! `reactive-graph`'s actual primitives (`create_signal`/`create_child_scope`/`provide_context`/
//! `use_context`) instead of `sycamore_reactive`'s.

use futures::channel::oneshot;
use futures::Future;
use reactive_graph::{
    create_child_scope, create_effect, create_signal, provide_context, use_context, Signal,
};

use crate::spawn_local_scoped;

/// A context value tracking every suspense scope's task-remaining signal, so a page-wide "is
/// anything still loading" query can be answered without walking the component tree.
#[derive(Clone, Debug, Default)]
struct AllTasksRemaining {
    all_tasks_remaining: Signal<Vec<Signal<u32>>>,
}

fn all_tasks_remaining() -> AllTasksRemaining {
    use_context::<AllTasksRemaining>().unwrap_or_else(|| {
        let value = AllTasksRemaining::default();
        provide_context(value.clone());
        value
    })
}

/// A single suspense scope: a count of outstanding tasks plus a link to its parent scope, so a
/// nested `Suspense` resolves only once both it and its ancestors are done loading.
#[derive(Clone, Debug)]
pub struct SuspenseScope {
    tasks_remaining: Signal<u32>,
    /// The enclosing suspense scope, if this one is nested inside another.
    pub parent: Option<Box<SuspenseScope>>,
}

impl SuspenseScope {
    /// Creates a new suspense scope, optionally nested under `parent`.
    pub fn new(parent: Option<Box<SuspenseScope>>) -> Self {
        let tasks_remaining = create_signal(0);
        let global = all_tasks_remaining();
        global.all_tasks_remaining.update(|tasks| tasks.push(tasks_remaining));
        Self { tasks_remaining, parent }
    }

    /// Whether this scope, or any ancestor, still has outstanding tasks.
    pub fn is_loading(&self) -> bool {
        self.tasks_remaining.get() > 0
            || self.parent.as_ref().is_some_and(|parent| parent.is_loading())
    }

    /// Resolves once this scope (and every ancestor) has no outstanding tasks left.
    pub async fn until_finished(self) {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        create_effect(move || {
            if !self.is_loading() {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
            }
        });
        let _ = rx.await;
    }
}

/// Registers `f` as a task tracked by the nearest enclosing suspense scope, incrementing its
/// remaining-task count until `f` resolves. Outside any suspense scope, `f` just runs normally.
pub fn create_suspense_task(f: impl Future<Output = ()> + 'static) {
    match use_context::<SuspenseScope>() {
        Some(scope) => {
            scope.tasks_remaining.update(|n| *n += 1);
            spawn_local_scoped(async move {
                f.await;
                scope.tasks_remaining.update(|n| *n -= 1);
            });
        }
        None => spawn_local_scoped(f),
    }
}

/// Runs `f` inside a fresh child scope with a new [`SuspenseScope`] provided as context, nested
/// under the current suspense scope if one is active. Returns `f`'s return value alongside the
/// scope that was created, so the caller can `await scope.until_finished()`.
pub fn create_suspense_scope<T>(f: impl FnOnce() -> T) -> (T, SuspenseScope) {
    let parent = use_context::<SuspenseScope>();
    let scope = SuspenseScope::new(parent.map(Box::new));
    let mut ret = None;
    create_child_scope(|| {
        provide_context(scope.clone());
        ret = Some(f());
    });
    (ret.expect("child scope runs its closure synchronously"), scope)
}

/// Waits until every task registered against the current suspense scope (not a freshly created
/// one) has resolved. Resolves immediately if called outside a suspense scope.
pub async fn await_suspense_current() {
    if let Some(scope) = use_context::<SuspenseScope>() {
        scope.until_finished().await;
    }
}

/// Whether the current suspense scope (or any of its ancestors) is still loading. Reactive: call
/// this from inside a [`view-core`](https://docs.rs/view-core) `Dynamic` view or effect to track
/// it. Returns `false` outside of any suspense scope.
pub fn use_is_loading() -> bool {
    use_context::<SuspenseScope>().is_some_and(|scope| scope.is_loading())
}

/// Whether *any* suspense scope anywhere is still loading, independent of component nesting.
/// Useful for a page-level loading indicator.
pub fn use_is_loading_global() -> bool {
    match use_context::<AllTasksRemaining>() {
        Some(global) => global
            .all_tasks_remaining
            .with(|scopes| scopes.iter().any(|remaining| remaining.get() > 0)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use reactive_graph::create_root;

    use super::*;

    #[test]
    fn nested_scope_reports_a_parent() {
        let _ = create_root(|| {
            let _ = create_suspense_scope(|| {
                let outer = use_context::<SuspenseScope>().unwrap();
                assert!(outer.parent.is_none());
                let _ = create_suspense_scope(|| {
                    let inner = use_context::<SuspenseScope>().unwrap();
                    assert!(inner.parent.is_some());
                });
            });
        });
    }

    #[tokio::test]
    async fn await_suspense_resolves_after_task_completes() {
        let (tx, rx) = oneshot::channel();
        let is_completed = Rc::new(Cell::new(false));

        let local = tokio::task::LocalSet::new();
        local
            .run_until({
                let is_completed = is_completed.clone();
                async move {
                    let _ = create_root(move || {
                        spawn_local_scoped(async move {
                            let (_, scope) = create_suspense_scope(|| {
                                create_suspense_task(async move {
                                    rx.await.unwrap();
                                });
                            });
                            scope.until_finished().await;
                            is_completed.set(true);
                        });
                    });
                }
            })
            .await;

        assert!(!is_completed.get());
        tx.send(()).unwrap();
        local.await;
        assert!(is_completed.get());
    }
}
