//! The cooperative, single-threaded job scheduler.
//!
//! Jobs are keyed by [`NodeId`] (an effect/subscriber re-run) so that scheduling the same node
//! twice within a cycle is naturally deduplicated to one run, as required of `flush: 'pre'`
//! and `flush: 'post'` subscribers.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};

use crate::node::NodeId;

/// When a scheduled job should run relative to the mutation that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushMode {
    /// Runs immediately, synchronously with the mutation, in registration order.
    Sync,
    /// Runs at the start of the next flush boundary, before `Post` jobs.
    Pre,
    /// Runs after the `Pre` queue has drained, at the same flush boundary.
    Post,
}

impl Default for FlushMode {
    fn default() -> Self {
        FlushMode::Pre
    }
}

#[derive(Default)]
pub(crate) struct Scheduler {
    pre_queue: RefCell<VecDeque<NodeId>>,
    post_queue: RefCell<VecDeque<NodeId>>,
    /// Nodes currently present in `pre_queue` or `post_queue`, for O(1) dedup checks.
    queued: RefCell<HashSet<NodeId>>,
    flushing: Cell<bool>,
    error_handler: RefCell<Option<Box<dyn Fn(SchedulerJobError)>>>,
}

/// Reported to the scheduler's error handler when a job panics during flush.
#[derive(Debug)]
pub struct SchedulerJobError {
    pub node: NodeId,
    pub message: String,
}

impl Scheduler {
    pub fn set_error_handler(&self, handler: impl Fn(SchedulerJobError) + 'static) {
        *self.error_handler.borrow_mut() = Some(Box::new(handler));
    }

    fn report_error(&self, err: SchedulerJobError) {
        if let Some(handler) = self.error_handler.borrow().as_ref() {
            handler(err);
        } else {
            #[cfg(feature = "trace")]
            tracing::error!(node = ?err.node, "scheduler job failed: {}", err.message);
            #[cfg(not(feature = "trace"))]
            let _ = err;
        }
    }

    /// Enqueue `node` to run under `mode`. For `Sync`, runs `run` immediately. For `Pre`/`Post`,
    /// pushes onto the matching queue unless already queued.
    pub fn schedule(&self, node: NodeId, mode: FlushMode, run: impl FnOnce(NodeId)) {
        match mode {
            FlushMode::Sync => {
                self.run_one(node, run);
            }
            FlushMode::Pre => self.enqueue(&self.pre_queue, node),
            FlushMode::Post => self.enqueue(&self.post_queue, node),
        }
    }

    fn enqueue(&self, queue: &RefCell<VecDeque<NodeId>>, node: NodeId) {
        if self.queued.borrow_mut().insert(node) {
            queue.borrow_mut().push_back(node);
        }
    }

    fn run_one(&self, node: NodeId, run: impl FnOnce(NodeId)) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(node)));
        if let Err(payload) = result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "job panicked".to_string());
            self.report_error(SchedulerJobError { node, message });
        }
    }

    /// Cancel a pending job by node identity, if queued.
    pub fn cancel_node(&self, node: NodeId) {
        self.queued.borrow_mut().remove(&node);
        self.pre_queue.borrow_mut().retain(|&n| n != node);
        self.post_queue.borrow_mut().retain(|&n| n != node);
    }

    /// Runs `pre` exhaustively (including any `pre` jobs newly scheduled while draining), then
    /// `post` exhaustively, re-entering `pre` if a `post` job schedules more `pre` work. A
    /// re-entrant call (from inside a running job) is a no-op; the outer `flush` loop will pick
    /// up the newly queued work.
    pub fn flush(&self, run: impl Fn(NodeId) + Copy) {
        if self.flushing.get() {
            return;
        }
        self.flushing.set(true);
        loop {
            self.drain(&self.pre_queue, run);
            self.drain(&self.post_queue, run);
            if self.pre_queue.borrow().is_empty() && self.post_queue.borrow().is_empty() {
                break;
            }
        }
        self.flushing.set(false);
    }

    fn drain(&self, queue: &RefCell<VecDeque<NodeId>>, run: impl Fn(NodeId)) {
        loop {
            let next = queue.borrow_mut().pop_front();
            let Some(node) = next else { break };
            self.queued.borrow_mut().remove(&node);
            self.run_one(node, run);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pre_queue.borrow().is_empty() || !self.post_queue.borrow().is_empty()
    }
}

/// Forces an immediate, full flush of the `pre` and `post` queues. Used by tests and by initial
/// mount, where there is no surrounding event loop to schedule a later tick.
pub fn flush_sync() {
    let root = crate::root::Root::global();
    root.scheduler.flush(|n| root.run_node_update(n));
}

/// Runs `f` after the next flush. Since this crate has no event loop of its own, this performs an
/// immediate `flush_sync` before calling `f` — a host integration with a real microtask queue
/// would instead schedule `f` to run after its own next tick flushes this scheduler.
pub fn next_tick<T>(f: impl FnOnce() -> T) -> T {
    flush_sync();
    f()
}

/// Returns `true` if any `pre`/`post` job is currently queued.
pub fn has_pending_jobs() -> bool {
    crate::root::Root::global().scheduler.has_pending()
}
