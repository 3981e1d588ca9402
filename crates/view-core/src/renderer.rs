//! The view tree's host port: the operations it needs from a concrete rendering backend.
//!
//! Grounded on the corpus's `GenericNode` trait, but reshaped around free operations that take
//! node arguments (`insert(node, anchor)`, `replace(new, old)`, ...) rather than methods on the
//! node itself, matching the operation list this runtime's spec names one-to-one.

use std::fmt::Debug;

/// A host fragment: an ordered run of sibling nodes bracketed by two anchor comments in the host
/// tree, so insertions/removals within it are scoped between `start` and `end`.
#[derive(Debug, Clone)]
pub struct HostFragment<N> {
    pub start: N,
    pub end: N,
}

/// Abstraction over a rendering backend (browser DOM, SSR string sink, in-memory test tree).
///
/// `view-core` is generic over `R: HostRenderer` the same way the grounding corpus's core crate
/// is generic over `G: GenericNode`. Implementations should be cheap to clone (typically an `Rc`
/// or index into an arena) and preserve reference equality.
pub trait HostRenderer: Clone + PartialEq + Eq + Debug + 'static {
    /// Opaque node handle (element, text, comment, or fragment marker).
    type Node: Clone + PartialEq + Eq + Debug + 'static;

    /// Creates a new element node with the given tag name.
    fn create_element(&self, tag: &str) -> Self::Node;
    /// Creates a new text node with the given initial content.
    fn create_text(&self, text: &str) -> Self::Node;
    /// Creates a new comment node, used as an anchor for `Dynamic`/conditional views.
    fn create_comment(&self, text: &str) -> Self::Node;
    /// Creates a fragment: two comment anchors bracketing a (possibly empty) run of children.
    fn create_fragment(&self) -> HostFragment<Self::Node>;

    /// Inserts `node` immediately before `anchor` under `parent`. `anchor = None` appends at the
    /// end, mirroring `Node.insertBefore(node, null)`.
    fn insert(&self, parent: &Self::Node, node: &Self::Node, anchor: Option<&Self::Node>);
    /// Appends `node` as the last child of `parent`.
    fn append(&self, parent: &Self::Node, node: &Self::Node);
    /// Replaces `old` with `new` in the host tree; `old`'s parent must still be attached.
    fn replace(&self, new: &Self::Node, old: &Self::Node);
    /// Detaches `node` from its parent.
    fn remove(&self, node: &Self::Node);

    /// Sets (or, if `next` is `None`, removes) an attribute. `prev` is supplied so event-handler
    /// values can be swapped by removing the previous handler before installing the new one.
    fn set_attribute(&self, node: &Self::Node, key: &str, next: Option<&str>, prev: Option<&str>);
    /// Overwrites the text content of a text or comment node.
    fn set_text(&self, node: &Self::Node, value: &str);

    /// Returns `true` if `node` is a fragment marker rather than a concrete element/text/comment.
    fn is_fragment(&self, node: &Self::Node) -> bool;
    /// Returns `true` if `node` belongs to the SVG namespace.
    fn is_svg_element(&self, node: &Self::Node) -> bool;

    /// Bounding rectangle in host coordinates, consumed by `Transition`-like collaborators.
    /// Backends that don't lay out content (e.g. SSR) can leave this at the default.
    fn bounding_client_rect(&self, _node: &Self::Node) -> Option<(f64, f64, f64, f64)> {
        None
    }
    /// CSS animation duration in milliseconds, if `node` has one running.
    fn animation_duration(&self, _node: &Self::Node) -> Option<f64> {
        None
    }
    /// CSS transition duration in milliseconds, if `node` has one running.
    fn transition_duration(&self, _node: &Self::Node) -> Option<f64> {
        None
    }
}
