//! Low-level provide/inject: a value stashed on the current node, visible to anything reading it
//! from that node or any of its descendants. `view-core`'s component runtime builds its own
//! provide/inject on top of this, walking the *component*-view chain rather than every scope
//! (see `SPEC_FULL.md` §4.9) — this is the primitive it's grounded on.

use slotmap::Key;

use crate::root::Root;

/// Stashes `value` on the current scope, visible to [`use_context`] called from this scope or any
/// scope nested inside it. A no-op outside of any scope.
pub fn provide_context<T: 'static>(value: T) {
    let root = Root::global();
    let current = root.current_node.get();
    if current.is_null() {
        return;
    }
    if let Some(node) = root.nodes.borrow_mut().get_mut(current) {
        node.context.push(Box::new(value));
    }
}

/// Walks up from the current scope looking for the nearest `provide_context::<T>` ancestor
/// (including the current scope itself), returning a clone of the first match.
pub fn use_context<T: Clone + 'static>() -> Option<T> {
    let root = Root::global();
    let mut node_id = root.current_node.get();
    loop {
        if node_id.is_null() {
            return None;
        }
        let (hit, parent) = {
            let nodes = root.nodes.borrow();
            match nodes.get(node_id) {
                Some(node) => (
                    node.context.iter().rev().find_map(|ctx| ctx.downcast_ref::<T>().cloned()),
                    node.parent,
                ),
                None => return None,
            }
        };
        if hit.is_some() {
            return hit;
        }
        node_id = parent;
    }
}

/// Like [`use_context`], but panics with a message naming `what` if no provider is found.
#[track_caller]
pub fn expect_context<T: Clone + 'static>(what: &'static str) -> T {
    use_context().unwrap_or_else(|| panic!("no context provided for `{what}`"))
}

#[cfg(test)]
mod tests {
    use crate::root::{create_child_scope, create_root};

    use super::*;

    #[test]
    fn inject_sees_ancestor_provide() {
        let _ = create_root(|| {
            provide_context(42i32);
            create_child_scope(|| {
                assert_eq!(use_context::<i32>(), Some(42));
            });
        });
    }

    #[test]
    fn inject_returns_none_without_provider() {
        let _ = create_root(|| {
            assert_eq!(use_context::<i32>(), None);
        });
    }

    #[test]
    fn nearer_provide_shadows_farther_one() {
        let _ = create_root(|| {
            provide_context(1i32);
            create_child_scope(|| {
                provide_context(2i32);
                assert_eq!(use_context::<i32>(), Some(2));
            });
            assert_eq!(use_context::<i32>(), Some(1));
        });
    }
}
