//! Effects: reactive side effects that (re-)run whenever one of their dependencies changes.
//!
//! Plain [`create_effect`] runs synchronously, both on creation and on every dependency change —
//! this is the classic, teacher-style effect. [`create_effect_pre`]/[`create_effect_post`] back
//! the scheduled `pre`/`post` flush-mode subscribers used by the `watch` API: their first run and
//! every subsequent rerun is deferred to the next [`crate::scheduler::flush_sync`]/`flush`.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::error::{GraphError, GraphResult};
use crate::node::{NodeHandle, NodeId, NodeKind};
use crate::root::Root;
use crate::scheduler::FlushMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Paused,
    Disposed,
}

/// A handle to a scheduled effect, supporting the pause/resume/dispose lifecycle. Cheap to clone;
/// every clone controls the same underlying effect.
#[derive(Clone)]
pub struct Effect {
    id: NodeId,
    mode: FlushMode,
    lifecycle: Rc<Cell<Lifecycle>>,
}

impl Effect {
    /// `pub(crate)` rather than `pub`: every public flush mode already has its own constructor
    /// below, this one additionally lets `watch.rs` build a `Sync`-mode effect directly (for
    /// `WatchOptions { batch: false, .. }`) without going through `create_effect`, which discards
    /// the `Effect` handle `Subscriber` needs.
    pub(crate) fn new(mode: FlushMode, mut f: impl FnMut() + 'static) -> Self {
        let lifecycle = Rc::new(Cell::new(Lifecycle::Active));
        let guard = lifecycle.clone();
        // Captured now, not re-derived when the callback actually runs: by the time a `pre`/`post`
        // job executes, the `scope.run(...)` call that created this effect has already returned
        // and unwound `ACTIVE_SCOPES` back past it.
        let owning_scope = crate::scope::active_scope();
        let callback: Box<dyn FnMut(&mut Box<dyn Any>) -> bool> = Box::new(move |_value| {
            if guard.get() == Lifecycle::Active {
                if let Err(payload) =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f()))
                {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "effect panicked".to_string());
                    if let Some(scope) = owning_scope.as_ref() {
                        scope.report_error(&message, "effect");
                    } else {
                        #[cfg(feature = "trace")]
                        tracing::error!(source = "effect", "{message}");
                        #[cfg(not(feature = "trace"))]
                        let _ = message;
                    }
                }
            }
            true
        });
        let root = Root::global();
        let id = root.create_node(NodeKind::Effect(mode), Box::new(()), Some(callback));
        root.scheduler.schedule(id, mode, |n| root.run_node_update(n));
        let effect = Effect { id, mode, lifecycle };
        crate::scope::attach_to_active_scope(&effect);
        effect
    }

    /// Returns a handle usable with the generic node APIs (`is_alive`, `dispose`).
    pub fn handle(&self) -> NodeHandle {
        NodeHandle(self.id)
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.get() == Lifecycle::Active && self.handle().is_alive()
    }

    pub fn is_paused(&self) -> bool {
        self.lifecycle.get() == Lifecycle::Paused
    }

    /// Suspends reruns: dependency changes while paused are silently dropped. Does not clear
    /// previously tracked dependencies.
    pub fn pause(&self) -> GraphResult<()> {
        match self.lifecycle.get() {
            Lifecycle::Disposed => Err(GraphError::UseAfterDispose { what: "effect" }),
            Lifecycle::Paused => Err(GraphError::IllegalState { what: "effect", from: "paused" }),
            Lifecycle::Active => {
                self.lifecycle.set(Lifecycle::Paused);
                Ok(())
            }
        }
    }

    /// Resumes a paused effect and immediately schedules a rerun to pick up any changes missed
    /// while paused.
    pub fn resume(&self) -> GraphResult<()> {
        match self.lifecycle.get() {
            Lifecycle::Disposed => Err(GraphError::UseAfterDispose { what: "effect" }),
            Lifecycle::Active => Err(GraphError::IllegalState { what: "effect", from: "active" }),
            Lifecycle::Paused => {
                self.lifecycle.set(Lifecycle::Active);
                let root = Root::global();
                let id = self.id;
                root.scheduler.schedule(id, self.mode, |n| root.run_node_update(n));
                Ok(())
            }
        }
    }

    /// Disposes the effect: no further reruns, dependency edges torn down, cleanups run.
    pub fn dispose(self) {
        self.lifecycle.set(Lifecycle::Disposed);
        self.id.dispose();
    }
}

/// Creates an effect that runs immediately (including its first run) whenever a tracked
/// dependency changes.
///
/// # Example
/// ```ignore
/// create_root(|| {
///     let state = create_signal(0);
///     create_effect(move || {
///         println!("new state = {}", state.get());
///     });
///     state.set(1); // prints "new state = 1"
/// });
/// ```
///
/// `create_effect` is for side-effects. To derive a reactive value, use [`crate::create_memo`].
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_effect(f: impl FnMut() + 'static) {
    Effect::new(FlushMode::Sync, f);
}

/// Like [`create_effect`], but both the first run and every rerun are deferred to the next `pre`
/// flush instead of running inline.
pub fn create_effect_pre(f: impl FnMut() + 'static) -> Effect {
    Effect::new(FlushMode::Pre, f)
}

/// Like [`create_effect`], but both the first run and every rerun are deferred to the next `post`
/// flush (after all `pre` jobs have drained).
pub fn create_effect_post(f: impl FnMut() + 'static) -> Effect {
    Effect::new(FlushMode::Post, f)
}

/// Schedules `f` to run exactly once under `mode`, independent of any tracked dependency —
/// spec.md's `queueJob`. Implemented as a one-shot effect rather than adding a second job queue:
/// it runs on the next matching flush, then pauses itself (same reentrancy discipline `watch`'s
/// `once` option already uses — pausing from inside the running body only flips a `Cell`, it never
/// touches the arena, whereas disposing there would).
pub fn queue_job(mode: FlushMode, f: impl FnOnce() + 'static) {
    let f = std::cell::RefCell::new(Some(f));
    let effect_holder: Rc<std::cell::RefCell<Option<Effect>>> = Rc::new(std::cell::RefCell::new(None));
    let effect_holder_for_body = effect_holder.clone();
    let effect = Effect::new(mode, move || {
        if let Some(f) = f.borrow_mut().take() {
            f();
        }
        if let Some(effect) = effect_holder_for_body.borrow().as_ref() {
            let _ = effect.pause();
        }
    });
    *effect_holder.borrow_mut() = Some(effect);
}

#[cfg(test)]
mod tests {
    use crate::root::{create_child_scope, create_root};
    use crate::scheduler::flush_sync;
    use crate::signal::create_signal;
    use crate::utils::on;

    use super::*;

    #[test]
    fn effect_runs_immediately_and_on_change() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let double = create_signal(-1);
            create_effect(move || {
                double.set(state.get() * 2);
            });
            assert_eq!(double.get(), 0);
            state.set(1);
            assert_eq!(double.get(), 2);
            state.set(2);
            assert_eq!(double.get(), 4);
        });
    }

    #[test]
    fn effect_with_explicit_dependencies() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let double = create_signal(-1);
            create_effect(on(state, move || {
                double.set(state.get() * 2);
            }));
            assert_eq!(double.get(), 0);
            state.set(1);
            assert_eq!(double.get(), 2);
        });
    }

    #[test]
    fn effect_should_only_subscribe_once_to_same_signal() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let counter = create_signal(0);
            create_effect(move || {
                counter.set_silent(counter.get_untracked() + 1);
                state.track();
                state.track();
            });
            assert_eq!(counter.get(), 1);
            state.set(1);
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn outer_effects_run_first() {
        let _ = create_root(|| {
            let trigger = create_signal(());
            let outer_counter = create_signal(0);
            let inner_counter = create_signal(0);
            create_effect(move || {
                trigger.track();
                outer_counter.set_silent(outer_counter.get_untracked() + 1);
                create_effect(move || {
                    trigger.track();
                    inner_counter.set_silent(inner_counter.get_untracked() + 1);
                });
            });
            assert_eq!(outer_counter.get(), 1);
            assert_eq!(inner_counter.get(), 1);
            trigger.set(());
            assert_eq!(outer_counter.get(), 2);
            assert_eq!(inner_counter.get(), 2);
        });
    }

    #[test]
    fn destroy_effects_on_scope_dispose() {
        let _ = create_root(|| {
            let counter = create_signal(0);
            let trigger = create_signal(());
            let child_scope = create_child_scope(move || {
                create_effect(move || {
                    trigger.track();
                    counter.set_silent(counter.get_untracked() + 1);
                });
            });
            assert_eq!(counter.get(), 1);
            trigger.set(());
            assert_eq!(counter.get(), 2);
            child_scope.dispose();
            trigger.set(());
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn pre_and_post_effects_defer_first_run_to_flush() {
        let _ = create_root(|| {
            let pre_runs = create_signal(0);
            let post_runs = create_signal(0);
            create_effect_pre(move || pre_runs.update_silent(|r| *r += 1));
            create_effect_post(move || post_runs.update_silent(|r| *r += 1));
            assert_eq!(pre_runs.get_untracked(), 0);
            assert_eq!(post_runs.get_untracked(), 0);
            flush_sync();
            assert_eq!(pre_runs.get_untracked(), 1);
            assert_eq!(post_runs.get_untracked(), 1);
        });
    }

    #[test]
    fn pause_suspends_reruns_until_resumed() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let effect = create_effect_pre(move || {
                state.track();
                runs.update_silent(|r| *r += 1);
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            effect.pause().unwrap();
            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            effect.resume().unwrap();
            flush_sync();
            assert_eq!(runs.get_untracked(), 2);
        });
    }

    #[test]
    fn dispose_stops_reruns() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let effect = create_effect_pre(move || {
                state.track();
                runs.update_silent(|r| *r += 1);
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);
            effect.dispose();
            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);
        });
    }

    #[test]
    fn panicking_effect_routes_to_its_owning_scope_error_handler() {
        use crate::scope::EffectScope;

        let _ = create_root(|| {
            let should_panic = create_signal(false);
            let caught: Rc<std::cell::RefCell<Vec<String>>> = Rc::new(std::cell::RefCell::new(Vec::new()));
            let caught_for_handler = caught.clone();

            let scope = EffectScope::new();
            scope.set_error_handler(move |message, source| {
                caught_for_handler.borrow_mut().push(format!("{source}: {message}"));
            });
            scope.run(|| {
                create_effect_pre(move || {
                    if should_panic.get() {
                        panic!("boom");
                    }
                });
            });
            flush_sync();
            assert!(caught.borrow().is_empty());

            should_panic.set(true);
            flush_sync();
            assert_eq!(caught.borrow().as_slice(), ["effect: boom"]);
        });
    }

    #[test]
    fn queue_job_runs_once_and_does_not_rerun_on_unrelated_changes() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            queue_job(FlushMode::Pre, move || {
                runs.update_silent(|r| *r += 1);
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);
        });
    }
}
