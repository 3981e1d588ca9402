//! `SignalListener`: a fire-counted effect that stops itself after a fixed number of triggers
//! (spec.md §3's `SignalListener` row: "trigger count, limit, callback... auto-disposes when
//! count reaches positive limit").

use std::cell::Cell;
use std::rc::Rc;

use crate::effect::{queue_job, Effect};
use crate::scheduler::FlushMode;

/// A subscriber that runs `cb` on every tracked change to `source`, same as
/// [`crate::watch::watch_effect`], but disposes itself once it has fired `limit` times. `limit ==
/// 0` never auto-disposes (an explicit `Subscriber`-style handle would be required, which this
/// type doesn't expose — use `watch_effect` directly if you need unlimited firings).
#[derive(Clone)]
pub struct SignalListener {
    effect: Effect,
    count: Rc<Cell<usize>>,
    limit: usize,
}

impl SignalListener {
    /// How many times the callback has run so far.
    pub fn fire_count(&self) -> usize {
        self.count.get()
    }

    /// The fire-count limit this listener was created with (`0` = unlimited).
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn dispose(self) {
        self.effect.dispose();
    }
}

/// Creates a [`SignalListener`]: `f` runs tracked, same as an effect, and once it has completed its
/// `limit`-th run the underlying effect is disposed automatically.
///
/// The dispose happens on the next `post` flush rather than inline from within the triggering run:
/// disposing a node from inside its own currently-executing callback would have the callback's
/// caller (`Root::run_node_update`) index back into the arena slot it just freed. Deferring one
/// flush avoids that without weakening the "auto-disposes at the limit" guarantee — once queued,
/// the post job runs before any caller can observe the listener having fired an extra time.
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_listener(limit: usize, mut f: impl FnMut() + 'static) -> SignalListener {
    let count = Rc::new(Cell::new(0usize));
    let count_for_body = count.clone();
    let effect_holder: Rc<std::cell::RefCell<Option<Effect>>> = Rc::new(std::cell::RefCell::new(None));
    let effect_holder_for_body = effect_holder.clone();

    let effect = Effect::new(FlushMode::Sync, move || {
        f();
        let n = count_for_body.get() + 1;
        count_for_body.set(n);
        if limit > 0 && n >= limit {
            if let Some(effect) = effect_holder_for_body.borrow().clone() {
                queue_job(FlushMode::Post, move || effect.dispose());
            }
        }
    });
    *effect_holder.borrow_mut() = Some(effect.clone());
    SignalListener { effect, count, limit }
}

#[cfg(test)]
mod tests {
    use crate::root::create_root;
    use crate::scheduler::flush_sync;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn listener_auto_disposes_once_it_reaches_its_limit() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let listener = create_listener(2, move || {
                state.track();
                runs.update_silent(|r| *r += 1);
            });
            assert_eq!(runs.get_untracked(), 1);
            assert_eq!(listener.fire_count(), 1);
            assert!(listener.is_active());

            state.set(1);
            assert_eq!(runs.get_untracked(), 2);
            assert_eq!(listener.fire_count(), 2);

            flush_sync();
            assert!(!listener.is_active(), "listener must dispose once it hits its limit");

            state.set(2);
            flush_sync();
            assert_eq!(runs.get_untracked(), 2, "disposed listener must not rerun");
        });
    }

    #[test]
    fn zero_limit_never_auto_disposes() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let listener = create_listener(0, move || {
                state.track();
                runs.update_silent(|r| *r += 1);
            });
            state.set(1);
            state.set(2);
            flush_sync();
            assert_eq!(runs.get_untracked(), 3);
            assert!(listener.is_active());
        });
    }
}
