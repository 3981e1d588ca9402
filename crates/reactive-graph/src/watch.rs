//! `Subscriber`/`watch`: bridges the signal graph to user callbacks, with an explicit old/new
//! value and before-next-run/on-dispose cleanup closures.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::Effect;
use crate::error::GraphResult;
use crate::root::on_cleanup;
use crate::scheduler::FlushMode;

/// Options accepted by [`watch`]/[`watch_effect`]/[`watch_property`].
#[derive(Clone, Copy)]
pub struct WatchOptions {
    /// Run the callback once, synchronously, right at creation (in addition to every later
    /// change). Default `false`.
    pub immediate: bool,
    /// When the callback runs relative to the triggering mutation. Default `Pre`.
    pub flush: FlushMode,
    /// Stop after the first callback invocation. Default `false`.
    pub once: bool,
    /// Coalesce every notification within the same flush into a single callback run. Default
    /// `true`. `false` ignores `flush` and runs the underlying effect in `Sync` mode instead, so
    /// every triggering mutation gets its own immediate, separate run rather than being deduped
    /// with others queued in the same cycle.
    pub batch: bool,
    /// Attach the underlying subscriber to the currently active scope. Default `true`. `false`
    /// detaches it, so disposing the enclosing scope does not also stop this watcher.
    pub scope: bool,
    /// In a proxy-based host, watching a deeply mutable object hands `cb` the same backing
    /// reference for `old` and `new`, so by the time `cb` runs the "old" value has already been
    /// mutated too unless it's deep-cloned first; `clone` asks for that deep clone. Our signal
    /// values are already read out by-value into an owned `T` the instant they change (see
    /// [`watch`]'s `prev.borrow_mut().replace(new)`), so `old` and `new` are never aliased here —
    /// this field exists for API parity with spec.md but is currently a no-op.
    pub clone: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            immediate: false,
            flush: FlushMode::Pre,
            once: false,
            batch: true,
            scope: true,
            clone: false,
        }
    }
}

/// A schedulable effect bound to a user callback. Thin wrapper over [`Effect`]; see
/// [`watch`]/[`watch_effect`]/[`watch_property`] for how one is produced.
#[derive(Clone)]
pub struct Subscriber(Effect);

impl Subscriber {
    pub fn pause(&self) -> GraphResult<()> {
        self.0.pause()
    }

    pub fn resume(&self) -> GraphResult<()> {
        self.0.resume()
    }

    pub fn dispose(self) {
        self.0.dispose();
    }

    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }
}

fn make_effect(opts: &WatchOptions, f: impl FnMut() + 'static) -> Effect {
    let mode = if opts.batch { opts.flush } else { FlushMode::Sync };
    if opts.scope {
        Effect::new(mode, f)
    } else {
        crate::scope::without_scope_attach(|| Effect::new(mode, f))
    }
}

/// Tracks `source` and calls `cb(new, old)` whenever it changes. `source` is read inside the
/// subscriber's tracked scope, so any signal/computed it touches becomes a dependency — the same
/// mechanism an effect uses, not a separate deep-structural watch, since this crate's reactive
/// values are single-cell (see `SPEC_FULL.md` §9 on the single `ValueRef` decision).
///
/// `on_cleanup` can be called from inside `cb` (or `source`) to register a closure that runs
/// before the next invocation and on dispose, exactly as inside any effect body.
pub fn watch<T, F, C>(mut source: F, mut cb: C, opts: WatchOptions) -> Subscriber
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
    C: FnMut(&T, &T) + 'static,
{
    let prev: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
    let first_run = Rc::new(RefCell::new(true));
    let stopped = Rc::new(RefCell::new(false));
    let once = opts.once;
    let immediate = opts.immediate;

    let effect_holder: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
    let effect_holder_for_body = effect_holder.clone();

    let body = move || {
        if *stopped.borrow() {
            return;
        }
        let new = source();
        let is_first = *first_run.borrow();
        *first_run.borrow_mut() = false;

        if is_first {
            *prev.borrow_mut() = Some(new);
            if !immediate {
                return;
            }
        }

        let old = prev.borrow_mut().replace(new).unwrap();
        let new_ref = prev.borrow();
        let new_val = new_ref.as_ref().unwrap();
        if is_first || *new_val != old {
            cb(new_val, &old);
            if once {
                *stopped.borrow_mut() = true;
                if let Some(effect) = effect_holder_for_body.borrow().as_ref() {
                    // Safe to call from inside our own running body: `pause` only flips a Cell,
                    // it never touches the arena. The node itself stays allocated but inert;
                    // call `Subscriber::dispose` explicitly for full teardown.
                    let _ = effect.pause();
                }
            }
        }
    };

    let effect = make_effect(&opts, body);
    *effect_holder.borrow_mut() = Some(effect.clone());
    Subscriber(effect)
}

/// Runs `f` tracked, re-running whenever any signal/computed it reads changes. Unlike [`watch`],
/// there's no explicit old/new value — `f` itself decides what to do each run (`on_cleanup` is
/// still available inside it).
pub fn watch_effect(f: impl FnMut() + 'static, opts: WatchOptions) -> Subscriber {
    Subscriber(make_effect(&opts, f))
}

/// Alias for [`watch_effect`], covering spec.md's `watchChanges` entry in the public API list.
/// The spec gives `watchChanges` no behavior beyond that listing; "run tracked, rerun on any
/// recorded dependency change" is exactly what `watchEffect` already provides, so rather than
/// inventing undocumented semantics this is a thin rename over the same machinery.
pub fn watch_changes(f: impl FnMut() + 'static, opts: WatchOptions) -> Subscriber {
    watch_effect(f, opts)
}

/// Subscribes to a single `(signal, key)` pair: `accessor` should return the current value of the
/// property, and `watch_property` re-runs `cb` whenever that value changes.
pub fn watch_property<T, F, C>(accessor: F, cb: C, opts: WatchOptions) -> Subscriber
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
    C: FnMut(&T, &T) + 'static,
{
    watch(accessor, cb, opts)
}

/// Registers `f` to run before this subscriber's next invocation, or on its dispose — whichever
/// comes first. Must be called from inside a running subscriber/effect body.
pub fn on_watch_cleanup(f: impl FnOnce() + 'static) {
    on_cleanup(f);
}

#[cfg(test)]
mod tests {
    use crate::root::create_root;
    use crate::scheduler::flush_sync;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn watch_reports_old_and_new_on_change() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let calls = create_signal(Vec::<(i32, i32)>::new());
            watch(
                move || state.get(),
                move |new, old| {
                    calls.update_silent(|c| c.push((*new, *old)));
                },
                WatchOptions::default(),
            );
            flush_sync();
            assert_eq!(calls.get_clone_untracked(), vec![]);

            state.set(1);
            flush_sync();
            assert_eq!(calls.get_clone_untracked(), vec![(1, 0)]);

            state.set(1);
            flush_sync();
            assert_eq!(calls.get_clone_untracked(), vec![(1, 0)]);

            state.set(2);
            flush_sync();
            assert_eq!(calls.get_clone_untracked(), vec![(1, 0), (2, 1)]);
        });
    }

    #[test]
    fn watch_immediate_runs_once_at_creation() {
        let _ = create_root(|| {
            let state = create_signal(5);
            let calls = create_signal(0);
            watch(
                move || state.get(),
                move |_, _| calls.update_silent(|c| *c += 1),
                WatchOptions { immediate: true, ..Default::default() },
            );
            flush_sync();
            assert_eq!(calls.get_untracked(), 1);
        });
    }

    #[test]
    fn watch_once_stops_after_first_call() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let calls = create_signal(0);
            watch(
                move || state.get(),
                move |_, _| calls.update_silent(|c| *c += 1),
                WatchOptions { once: true, ..Default::default() },
            );
            flush_sync();
            state.set(1);
            flush_sync();
            assert_eq!(calls.get_untracked(), 1);

            state.set(2);
            flush_sync();
            assert_eq!(calls.get_untracked(), 1);
        });
    }

    #[test]
    fn batch_false_runs_synchronously_bypassing_the_scheduler() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let calls = create_signal(0);
            watch_effect(
                move || {
                    state.track();
                    calls.update_silent(|c| *c += 1);
                },
                WatchOptions { batch: false, ..Default::default() },
            );
            assert_eq!(calls.get_untracked(), 1);
            state.set(1);
            // No flush_sync: Sync-mode effects run inline, not via the pre/post queues.
            assert_eq!(calls.get_untracked(), 2);
        });
    }

    #[test]
    fn scope_false_detaches_the_subscriber_from_the_enclosing_scope() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let scope = crate::scope::EffectScope::new();
            scope.run(|| {
                watch_effect(
                    move || {
                        state.track();
                        runs.update_silent(|r| *r += 1);
                    },
                    WatchOptions { scope: false, ..Default::default() },
                );
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            scope.dispose();
            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 2, "scope:false must survive the owning scope's dispose");
        });
    }

    #[test]
    fn watch_effect_reruns_on_any_dependency() {
        let _ = create_root(|| {
            let a = create_signal(1);
            let b = create_signal(2);
            let sum = create_signal(0);
            watch_effect(
                move || sum.set_silent(a.get() + b.get()),
                WatchOptions::default(),
            );
            flush_sync();
            assert_eq!(sum.get_untracked(), 3);
            a.set(10);
            flush_sync();
            assert_eq!(sum.get_untracked(), 12);
        });
    }
}
