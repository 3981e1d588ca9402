//! [`Root`]: the arena owning every node in the reactive graph, plus the dependency tracker and
//! the topological dirty-propagation pass.

use std::any::Any;
use std::cell::{Cell, RefCell};

use slotmap::{Key, SlotMap};
use smallvec::SmallVec;

use crate::error::{GraphError, GraphResult};
use crate::node::{prune_weak_only, Dependent, Mark, NodeHandle, NodeId, NodeKind, NodeState, ReactiveNode};
use crate::scheduler::Scheduler;

/// Owns every reactive node created by one reactive application. Usually leaked (`Box::leak`) to
/// obtain a `&'static Root`, since the graph is expected to live for the app's whole lifetime;
/// [`RootHandle::dispose`] reclaims everything without needing the `Root` itself to be dropped.
pub(crate) struct Root {
    /// `Some` while a tracked scope is active; signal reads push themselves here.
    pub tracker: RefCell<Option<DependencyTracker>>,
    /// Stack of saved trackers for nested `pause_tracking`/`resume_tracking` brackets.
    pub paused_trackers: RefCell<Vec<Option<DependencyTracker>>>,
    /// Scratch buffer reused across `propagate_node_updates` calls.
    pub rev_sorted_buf: RefCell<Vec<NodeId>>,
    /// The node that owns everything currently being created (null key at the top level).
    pub current_node: Cell<NodeId>,
    pub root_node: Cell<NodeId>,
    pub nodes: RefCell<SlotMap<NodeId, ReactiveNode>>,
    /// Start-nodes whose dirty propagation is deferred until the end of the active batch.
    pub batch_queue: RefCell<Vec<NodeId>>,
    pub batching: Cell<bool>,
    pub scheduler: Scheduler,
}

thread_local! {
    static GLOBAL_ROOT: Cell<Option<&'static Root>> = const { Cell::new(None) };
}

impl Root {
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn global() -> &'static Root {
        GLOBAL_ROOT.with(|root| root.get()).expect("no reactive root found: call this from within `create_root`")
    }

    pub fn set_global(root: Option<&'static Root>) -> Option<&'static Root> {
        GLOBAL_ROOT.with(|r| r.replace(root))
    }

    pub fn new_static() -> &'static Self {
        let this = Self {
            tracker: RefCell::new(None),
            paused_trackers: RefCell::new(Vec::new()),
            rev_sorted_buf: RefCell::new(Vec::new()),
            current_node: Cell::new(NodeId::null()),
            root_node: Cell::new(NodeId::null()),
            nodes: RefCell::new(SlotMap::default()),
            batch_queue: RefCell::new(Vec::new()),
            batching: Cell::new(false),
            scheduler: Scheduler::default(),
        };
        let this = Box::leak(Box::new(this));
        this.reinit();
        this
    }

    /// Disposes everything held by this root and resets it to a fresh state.
    pub fn reinit(&'static self) {
        NodeHandle(self.root_node.get()).dispose();
        let _ = self.tracker.take();
        let _ = self.paused_trackers.take();
        let _ = self.rev_sorted_buf.take();
        let _ = self.batch_queue.take();
        let _ = self.current_node.take();
        let _ = self.root_node.take();
        let _ = self.nodes.take();
        self.batching.set(false);

        Root::set_global(Some(self));
        let root_node = create_child_scope(|| {});
        Root::set_global(None);
        self.root_node.set(root_node.0 .0);
    }

    pub fn create_child_scope(&'static self, f: impl FnOnce()) -> NodeHandle {
        let node = self.create_node(NodeKind::Signal, Box::new(()), None);
        let prev = self.current_node.replace(node);
        f();
        self.current_node.set(prev);
        NodeHandle(node)
    }

    /// Allocate a new node, attaching it as a child of the current node.
    pub(crate) fn create_node(
        &'static self,
        kind: NodeKind,
        value: Box<dyn Any>,
        callback: Option<Box<dyn FnMut(&mut Box<dyn Any>) -> bool>>,
    ) -> NodeId {
        let parent = self.current_node.get();
        let id = self.nodes.borrow_mut().insert(ReactiveNode {
            value: Some(value),
            callback,
            kind,
            children: Vec::new(),
            parent,
            dependents: Vec::new(),
            dependencies: Vec::new(),
            cleanups: Vec::new(),
            context: Vec::new(),
            state: NodeState::Clean,
            mark: Mark::None,
            #[cfg(debug_assertions)]
            created_at: std::panic::Location::caller(),
        });
        if !parent.is_null() {
            if let Some(parent_node) = self.nodes.borrow_mut().get_mut(parent) {
                parent_node.children.push(id);
            }
        }
        id
    }

    /// Run `f` in a tracked scope, collecting every signal it reads.
    ///
    /// Equivalent to [`Self::collect`] with [`CollectorMode::Exclusive`]: the collected
    /// dependencies are local to this call and do not leak into whatever tracker (if any) was
    /// active before it.
    pub fn tracked_scope<T>(&self, f: impl FnOnce() -> T) -> (T, DependencyTracker) {
        self.collect(CollectorMode::Exclusive, f)
    }

    /// Run `f` in a tracked scope under `mode` (spec.md's `collect(fn, mode)`).
    ///
    /// `Exclusive` collects only the dependencies read directly inside `f`, same as a plain
    /// effect/computed re-run. `Shared` does the same, but additionally re-reports every
    /// dependency it collects to whichever tracker was active before this call started (if any) —
    /// a nested `collect(..., Shared)` "leaks" its reads upward instead of keeping them local, so
    /// an outer tracked scope that calls into a `Shared` collector still ends up depending on
    /// everything the inner one read.
    pub fn collect<T>(&self, mode: CollectorMode, f: impl FnOnce() -> T) -> (T, DependencyTracker) {
        let prev = self.tracker.replace(Some(DependencyTracker::default()));
        let ret = f();
        let tracker = self.tracker.replace(prev).unwrap();
        if mode == CollectorMode::Shared {
            if let Some(outer) = self.tracker.borrow_mut().as_mut() {
                for &node in &tracker.dependencies {
                    outer.track(node);
                }
            }
        }
        (ret, tracker)
    }

    pub fn pause_tracking(&self) {
        let prev = self.tracker.replace(None);
        self.paused_trackers.borrow_mut().push(prev);
    }

    pub fn resume_tracking(&self) -> GraphResult<()> {
        let Some(prev) = self.paused_trackers.borrow_mut().pop() else {
            return Err(GraphError::InternalError {
                message: "resume_tracking called without a matching pause_tracking",
            });
        };
        self.tracker.replace(prev);
        Ok(())
    }

    /// Re-runs `current`'s callback (a computed's getter or an effect's body), rebuilding its
    /// dependency set, then marks its own dependents dirty so the next read/flush picks them up.
    #[cfg_attr(
        all(feature = "trace", not(debug_assertions)),
        tracing::instrument(skip(self))
    )]
    pub(crate) fn run_node_update(&'static self, current: NodeId) {
        if self.nodes.borrow().get(current).is_none() {
            return; // disposed before it got a chance to run.
        }
        {
            let mut nodes = self.nodes.borrow_mut();
            if nodes[current].state == NodeState::Checking {
                // Dynamic cycle: bail out, leave the previous value in place.
                return;
            }
            nodes[current].state = NodeState::Checking;
        }

        // Unlink old dependency edges; they'll be rebuilt from this run's tracked reads.
        let dependencies = std::mem::take(&mut self.nodes.borrow_mut()[current].dependencies);
        for dependency in dependencies {
            if let Some(dep) = self.nodes.borrow_mut().get_mut(dependency) {
                dep.dependents.retain(|d| d.id != current);
                prune_weak_only(&mut dep.dependents);
            }
        }

        let mut nodes_mut = self.nodes.borrow_mut();
        let mut callback = nodes_mut[current].callback.take().unwrap();
        let mut value = nodes_mut[current].value.take().unwrap();
        drop(nodes_mut);

        current.dispose_children();

        let prev = self.current_node.replace(current);
        let (changed, tracker) = self.tracked_scope(|| callback(&mut value));
        self.current_node.set(prev);

        tracker.create_dependency_link(self, current);

        let mut nodes_mut = self.nodes.borrow_mut();
        nodes_mut[current].callback = Some(callback);
        nodes_mut[current].value = Some(value);
        nodes_mut[current].state = NodeState::Clean;
        drop(nodes_mut);

        if changed {
            self.mark_dependents_dirty(current);
        }
    }

    fn mark_dependents_dirty(&self, current: NodeId) {
        let mut nodes_mut = self.nodes.borrow_mut();
        let Some(node) = nodes_mut.get_mut(current) else {
            return;
        };
        let dependents = std::mem::take(&mut node.dependents);
        for dependent in &dependents {
            if let Some(dependent_node) = nodes_mut.get_mut(dependent.id) {
                dependent_node.state = NodeState::Dirty;
            }
        }
        if let Some(node) = nodes_mut.get_mut(current) {
            node.dependents = dependents;
        }
    }

    /// Depth-first traversal of the dependents graph reachable from `start_nodes`, producing a
    /// reverse-topological-order buffer. Marks every non-start node visited as dirty along the
    /// way (conservative: a computed downstream may end up unchanged after it is pulled, but
    /// marking ensures every effect that could be affected gets scheduled).
    fn propagate_node_updates(&'static self, start_nodes: &[NodeId]) {
        let mut rev_sorted = Vec::new();
        let mut buf = self.rev_sorted_buf.try_borrow_mut();
        let rev_sorted = if let Ok(buf) = buf.as_mut() {
            buf.clear();
            buf
        } else {
            &mut rev_sorted
        };

        for &node in start_nodes {
            Self::dfs(node, &mut self.nodes.borrow_mut(), rev_sorted);
            self.mark_dependents_dirty(node);
        }
        #[cfg(feature = "trace")]
        tracing::trace!("propagate_node_updates: {} nodes reachable", rev_sorted.len());

        for &node in rev_sorted.iter().rev() {
            let mut nodes_mut = self.nodes.borrow_mut();
            let Some(entry) = nodes_mut.get_mut(node) else {
                continue;
            };
            entry.mark = Mark::None;
            if entry.state != NodeState::Dirty {
                continue;
            }
            let kind = entry.kind;
            drop(nodes_mut);
            if let NodeKind::Effect(mode) = kind {
                self.scheduler.schedule(node, mode, |n| self.run_node_update(n));
            }
            // Computed/Signal: left dirty, resolved lazily on next read.
        }
        // `Pre`/`Post` jobs just enqueued stay queued until `flush_sync`/`flush` is called; only
        // `Sync` jobs (already run inline by `Scheduler::schedule`) happen synchronously here.
    }

    #[cfg_attr(debug_assertions, track_caller)]
    pub fn propagate_updates(&'static self, start_node: NodeId) {
        if self.batching.get() {
            self.batch_queue.borrow_mut().push(start_node);
        } else {
            let prev = Root::set_global(Some(self));
            self.propagate_node_updates(&[start_node]);
            Root::set_global(prev);
        }
    }

    fn dfs(current_id: NodeId, nodes: &mut SlotMap<NodeId, ReactiveNode>, buf: &mut Vec<NodeId>) {
        let Some(current) = nodes.get_mut(current_id) else {
            return;
        };
        match current.mark {
            Mark::Temp => panic!("cyclic reactive dependency detected"),
            Mark::Permanent => return,
            Mark::None => {}
        }
        current.mark = Mark::Temp;
        if !matches!(current.state, NodeState::Checking) {
            current.state = NodeState::Dirty;
        }

        let children = std::mem::take(&mut current.dependents);
        for child in &children {
            Self::dfs(child.id, nodes, buf);
        }
        if let Some(node) = nodes.get_mut(current_id) {
            node.dependents = children;
            node.mark = Mark::Permanent;
        }
        buf.push(current_id);
    }

    fn start_batch(&self) {
        self.batching.set(true);
    }

    fn end_batch(&'static self) {
        self.batching.set(false);
        let nodes = self.batch_queue.take();
        if !nodes.is_empty() {
            self.propagate_node_updates(&nodes);
        }
    }
}

/// A handle to a [`Root`]; lets you reinitialize or dispose it for resource cleanup. Obtained
/// from [`create_root`].
#[derive(Clone, Copy)]
pub struct RootHandle {
    root: &'static Root,
}

impl RootHandle {
    /// Destroy everything that was created in this root.
    pub fn dispose(&self) {
        self.root.reinit();
    }

    /// Run `f` with this root as the current global root.
    pub fn run_in<T>(&self, f: impl FnOnce() -> T) -> T {
        let prev = Root::set_global(Some(self.root));
        let ret = f();
        Root::set_global(prev);
        ret
    }
}

/// Which dependencies a [`Root::collect`] call reports to, per spec.md's `collect(fn, mode)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorMode {
    /// Dependencies stay local to this call; nothing leaks to an outer tracked scope.
    Exclusive,
    /// Dependencies additionally propagate to whatever tracker was active before this call.
    Shared,
}

/// Tracks which nodes were read inside a `tracked_scope`. Records each dependency at most once.
#[derive(Default)]
pub(crate) struct DependencyTracker {
    pub dependencies: SmallVec<[NodeId; 4]>,
}

impl DependencyTracker {
    pub fn track(&mut self, node: NodeId) {
        if !self.dependencies.contains(&node) {
            self.dependencies.push(node);
        }
    }

    pub fn create_dependency_link(self, root: &Root, dependent: NodeId) {
        let weak = root
            .nodes
            .borrow()
            .get(dependent)
            .map(|n| matches!(n.kind, NodeKind::Computed))
            .unwrap_or(false);
        for &node in &self.dependencies {
            if let Some(n) = root.nodes.borrow_mut().get_mut(node) {
                n.dependents.push(Dependent { id: dependent, weak });
            }
        }
        if let Some(n) = root.nodes.borrow_mut().get_mut(dependent) {
            n.dependencies = self.dependencies;
        }
    }
}

/// Creates a new reactive root with a top-level scope. The returned [`RootHandle`] disposes it.
#[must_use = "a root should eventually be disposed"]
pub fn create_root(f: impl FnOnce()) -> RootHandle {
    let root = Root::new_static();
    Root::set_global(Some(root));
    f();
    Root::set_global(None);
    RootHandle { root }
}

/// Runs `f` in a tracked scope under `mode` (spec.md's `collect(fn, mode)`), returning `f`'s result
/// alongside how many distinct dependencies were collected. A thin, publicly-usable wrapper over
/// [`Root::collect`], whose own return type (`DependencyTracker`) is crate-private.
pub fn collect<T>(mode: CollectorMode, f: impl FnOnce() -> T) -> (T, usize) {
    let (ret, tracker) = Root::global().collect(mode, f);
    (ret, tracker.dependencies.len())
}

/// Create a child scope; everything allocated inside `f` is owned by the returned handle.
#[cfg_attr(debug_assertions, track_caller)]
pub fn create_child_scope(f: impl FnOnce()) -> NodeHandle {
    Root::global().create_child_scope(f)
}

/// Registers a callback to run when the current scope is disposed. No-op at the top level
/// (outside of any scope).
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    let root = Root::global();
    if !root.current_node.get().is_null() {
        if let Some(node) = root.nodes.borrow_mut().get_mut(root.current_node.get()) {
            node.cleanups.push(Box::new(f));
        }
    }
}

/// Batches updates from related signals: dirty propagation for signals set inside `f` is
/// deferred until `f` returns, so effects that depend on more than one of them run once.
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    let root = Root::global();
    root.start_batch();
    let ret = f();
    root.end_batch();
    ret
}

/// Runs `f` without tracking any signal reads inside it.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    untrack_in_scope(f, Root::global())
}

pub(crate) fn untrack_in_scope<T>(f: impl FnOnce() -> T, root: &'static Root) -> T {
    let prev = root.tracker.replace(None);
    let ret = f();
    root.tracker.replace(prev);
    ret
}

/// Pause tracking; must be paired with [`resume_tracking`]. Prefer [`untrack`] where possible.
pub fn pause_tracking() {
    Root::global().pause_tracking();
}

/// Resume tracking paused by [`pause_tracking`].
pub fn resume_tracking() -> GraphResult<()> {
    Root::global().resume_tracking()
}

/// A handle to the scope currently running.
pub fn use_current_scope() -> NodeHandle {
    let root = Root::global();
    NodeHandle(root.current_node.get())
}

/// A handle to the top-level scope of the current root.
pub fn use_global_scope() -> NodeHandle {
    let root = Root::global();
    NodeHandle(root.root_node.get())
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn cleanup() {
        let _ = create_root(|| {
            let cleanup_called = create_signal(false);
            let scope = create_child_scope(|| {
                on_cleanup(move || {
                    cleanup_called.set(true);
                });
            });
            assert!(!cleanup_called.get());
            scope.dispose();
            assert!(cleanup_called.get());
        });
    }

    #[test]
    fn cleanup_in_effect() {
        let _ = create_root(|| {
            let trigger = create_signal(());
            let counter = create_signal(0);

            create_effect(move || {
                trigger.track();
                on_cleanup(move || {
                    counter.set(counter.get_untracked() + 1);
                });
            });
            flush_sync();

            assert_eq!(counter.get(), 0);
            trigger.set(());
            flush_sync();
            assert_eq!(counter.get(), 1);
            trigger.set(());
            flush_sync();
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn batch_defers_effect_to_one_run() {
        let _ = create_root(|| {
            let state1 = create_signal(1);
            let state2 = create_signal(2);
            let counter = create_signal(0);
            create_effect(move || {
                counter.set_silent(counter.get_untracked() + 1);
                let _ = state1.get() + state2.get();
            });
            flush_sync();
            assert_eq!(counter.get_untracked(), 1);

            batch(move || {
                state1.set(3);
                state2.set(4);
            });
            flush_sync();
            assert_eq!(counter.get_untracked(), 2);
        });
    }

    #[test]
    fn shared_collector_mode_leaks_dependencies_to_the_outer_tracker() {
        let _ = create_root(|| {
            let a = create_signal(1);
            let root = Root::global();
            let (_, outer) = root.tracked_scope(|| {
                let (_, inner) = root.collect(CollectorMode::Shared, || {
                    a.track();
                });
                assert_eq!(inner.dependencies.len(), 1);
            });
            assert_eq!(outer.dependencies.len(), 1, "Shared mode should also report to the outer tracker");
        });
    }

    #[test]
    fn exclusive_collector_mode_keeps_dependencies_local() {
        let _ = create_root(|| {
            let a = create_signal(1);
            let root = Root::global();
            let (_, outer) = root.tracked_scope(|| {
                let (_, inner) = root.collect(CollectorMode::Exclusive, || {
                    a.track();
                });
                assert_eq!(inner.dependencies.len(), 1);
            });
            assert_eq!(outer.dependencies.len(), 0, "Exclusive mode must not leak to the outer tracker");
        });
    }
}
