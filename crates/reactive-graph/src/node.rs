//! Arena-backed nodes of the reactive graph.

use std::any::Any;

use slotmap::new_key_type;

use crate::root::Root;
use crate::scheduler::FlushMode;

new_key_type! {
    /// Identity of a node in the reactive graph. Stable for the lifetime of the node.
    pub struct NodeId;
}

/// What kind of node this is. Determines how `propagate_updates` treats it: signals are never
/// dirtied directly (only written through), computeds are dirtied but evaluated lazily on read,
/// effects are dirtied and immediately handed to the scheduler under their flush mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Signal,
    Computed,
    Effect(FlushMode),
}

/// A dependent edge: `id` read this node during its last evaluation. `weak` marks a pull-based
/// observer (a `Computed`, which only ever matters if something else reads it) as opposed to a
/// strong one (an `Effect`, which must keep running for its side effect regardless of whether
/// anything reads its output) — spec.md's "weak attachment", translated into this arena's
/// per-edge bookkeeping instead of the `Rc`-refcounting it describes. See [`prune_weak_only`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dependent {
    pub id: NodeId,
    pub weak: bool,
}

/// Drops `dependents` entirely once every remaining entry is weak: a dependency with only
/// pull-based (`Computed`) observers left and no strong (`Effect`) one doesn't need to keep
/// notifying anything — the next read of any surviving computed re-evaluates lazily regardless.
pub(crate) fn prune_weak_only(dependents: &mut Vec<Dependent>) {
    if !dependents.is_empty() && dependents.iter().all(|d| d.weak) {
        dependents.clear();
    }
}

/// A node in the reactive graph: could be a signal, a computed, or an effect.
pub(crate) struct ReactiveNode {
    /// Current value, boxed. Always `Some` except transiently while an update runs.
    pub value: Option<Box<dyn Any>>,
    /// Recomputation callback. `None` for plain signals. Returns whether the value changed.
    pub callback: Option<Box<dyn FnMut(&mut Box<dyn Any>) -> bool>>,
    pub kind: NodeKind,
    /// Child nodes allocated while this node last ran; disposed before the next run.
    pub children: Vec<NodeId>,
    /// Owning node, or the null key at the top level.
    pub parent: NodeId,
    /// Nodes that read this node during their last evaluation.
    pub dependents: Vec<Dependent>,
    /// Nodes this node read during its last evaluation.
    pub dependencies: Vec<NodeId>,
    /// Cleanup callbacks, run in registration order before the next re-run and on dispose.
    pub cleanups: Vec<Box<dyn FnOnce()>>,
    /// Context values provided at this node, looked up by downstream readers walking `parent`.
    pub context: Vec<Box<dyn Any>>,
    pub state: NodeState,
    /// DFS coloring used by `propagate_updates`'s topological sort.
    pub mark: Mark,
    #[cfg(debug_assertions)]
    pub created_at: &'static std::panic::Location<'static>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeState {
    Dirty,
    Clean,
    /// Currently being (re)evaluated. Re-entering a node in this state is a cycle.
    Checking,
}

/// DFS coloring for `propagate_updates`'s topological sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    Temp,
    Permanent,
    None,
}

/// An owning handle to a node, used to dispose subtrees (scopes, effects, components).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) NodeId);

impl NodeHandle {
    /// Disposes this node and, recursively, every child it owns. Cleanup callbacks run
    /// depth-first, children before parent.
    pub fn dispose(self) {
        self.0.dispose();
    }

    /// Returns `true` if the node has not been disposed.
    pub fn is_alive(self) -> bool {
        Root::global().nodes.borrow().contains_key(self.0)
    }
}

impl NodeId {
    pub(crate) fn dispose(self) {
        let root = Root::global();
        self.dispose_children();
        if let Some(node) = root.nodes.borrow_mut().remove(self) {
            for dependency in node.dependencies {
                if let Some(dep) = root.nodes.borrow_mut().get_mut(dependency) {
                    dep.dependents.retain(|d| d.id != self);
                    prune_weak_only(&mut dep.dependents);
                }
            }
        }
        root.scheduler.cancel_node(self);
    }

    /// Runs cleanups and disposes every child node, without removing `self` from the arena.
    pub(crate) fn dispose_children(self) {
        let root = Root::global();
        let Some(node) = root.nodes.borrow_mut().get_mut(self) else {
            return;
        };
        let cleanups = std::mem::take(&mut node.cleanups);
        let children = std::mem::take(&mut node.children);
        for cb in cleanups {
            // A dispose callback that panics must not prevent the remaining callbacks (or the
            // children below) from running; spec requires errors here routed to an error
            // handler with source tag `dispose`, not a hard abort.
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(cb)) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "dispose callback panicked".to_string());
                #[cfg(feature = "trace")]
                tracing::error!(source = "dispose", "{message}");
                #[cfg(not(feature = "trace"))]
                let _ = message;
            }
        }
        for child in children {
            child.dispose();
        }
    }
}
