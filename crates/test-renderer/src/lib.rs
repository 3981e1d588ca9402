//! An in-memory [`HostRenderer`] test double: no browser, no DOM, just a tree of `Rc`-linked
//! nodes that can be diffed or serialized to a string for assertions.
//!
//! Grounded on the corpus's `SsrNode` (`generic_node/ssr_node.rs`): an `Rc`-backed node with a
//! weak parent pointer and a `write_to_string`-style serializer, reshaped onto this runtime's
//! free-function [`HostRenderer`] trait instead of `GenericNode`'s methods-on-node shape.

#![warn(missing_docs)]

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use view_core::{HostFragment, HostRenderer};

enum Kind {
    Element { tag: String, attributes: RefCell<IndexMap<String, String>> },
    Text(RefCell<String>),
    Comment(RefCell<String>),
}

struct Inner {
    kind: Kind,
    parent: RefCell<Weak<Inner>>,
    children: RefCell<Vec<TestNode>>,
}

/// A node in the in-memory test tree. Cheap to clone (an `Rc` handle); equality is by identity.
#[derive(Clone)]
pub struct TestNode(Rc<Inner>);

impl TestNode {
    fn new(kind: Kind) -> Self {
        Self(Rc::new(Inner { kind, parent: RefCell::new(Weak::new()), children: RefCell::new(Vec::new()) }))
    }

    fn set_parent(&self, parent: &Rc<Inner>) {
        *self.0.parent.borrow_mut() = Rc::downgrade(parent);
    }

    fn clear_parent_if(&self, parent: &Rc<Inner>) {
        let is_parent = self.0.parent.borrow().upgrade().is_some_and(|p| Rc::ptr_eq(&p, parent));
        if is_parent {
            *self.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Returns the current parent, if this node is attached to one.
    pub fn parent(&self) -> Option<TestNode> {
        self.0.parent.borrow().upgrade().map(TestNode)
    }

    /// The current children of this node, in order. Empty for text/comment nodes.
    pub fn children(&self) -> Vec<TestNode> {
        self.0.children.borrow().clone()
    }

    /// Tag name, for an element node.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            Kind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Serializes this node (and its descendants) to an HTML-like string, mirroring the
    /// grounding corpus's SSR string renderer. Useful for snapshot assertions in tests.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.kind {
            Kind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes.borrow().iter() {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                out.push('>');
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Kind::Text(text) => out.push_str(&text.borrow()),
            Kind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(&text.borrow());
                out.push_str("-->");
            }
        }
    }
}

impl PartialEq for TestNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for TestNode {}

impl fmt::Debug for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            Kind::Element { tag, .. } => write!(f, "TestNode::Element({tag})"),
            Kind::Text(text) => write!(f, "TestNode::Text({:?})", text.borrow()),
            Kind::Comment(text) => write!(f, "TestNode::Comment({:?})", text.borrow()),
        }
    }
}

/// The in-memory [`HostRenderer`]. Stateless: all state lives on the [`TestNode`]s it creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TestRenderer;

impl HostRenderer for TestRenderer {
    type Node = TestNode;

    fn create_element(&self, tag: &str) -> Self::Node {
        TestNode::new(Kind::Element { tag: tag.to_string(), attributes: RefCell::new(IndexMap::new()) })
    }

    fn create_text(&self, text: &str) -> Self::Node {
        TestNode::new(Kind::Text(RefCell::new(text.to_string())))
    }

    fn create_comment(&self, text: &str) -> Self::Node {
        TestNode::new(Kind::Comment(RefCell::new(text.to_string())))
    }

    fn create_fragment(&self) -> HostFragment<Self::Node> {
        HostFragment { start: self.create_comment("/"), end: self.create_comment("/") }
    }

    fn insert(&self, parent: &Self::Node, node: &Self::Node, anchor: Option<&Self::Node>) {
        node.set_parent(&parent.0);
        let mut children = parent.0.children.borrow_mut();
        match anchor {
            Some(anchor) => {
                let index = children
                    .iter()
                    .position(|child| child == anchor)
                    .expect("anchor is not a child of parent");
                children.insert(index, node.clone());
            }
            None => children.push(node.clone()),
        }
    }

    fn append(&self, parent: &Self::Node, node: &Self::Node) {
        node.set_parent(&parent.0);
        parent.0.children.borrow_mut().push(node.clone());
    }

    fn replace(&self, new: &Self::Node, old: &Self::Node) {
        let parent = old.parent().expect("old node has no parent to replace within");
        new.set_parent(&parent.0);
        let mut children = parent.0.children.borrow_mut();
        let index = children.iter().position(|child| child == old).expect("old is not a child");
        children[index] = new.clone();
        old.clear_parent_if(&parent.0);
    }

    fn remove(&self, node: &Self::Node) {
        if let Some(parent) = node.parent() {
            parent.0.children.borrow_mut().retain(|child| child != node);
            node.clear_parent_if(&parent.0);
        }
    }

    fn set_attribute(&self, node: &Self::Node, key: &str, next: Option<&str>, _prev: Option<&str>) {
        let Kind::Element { attributes, .. } = &node.0.kind else {
            panic!("set_attribute called on a non-element node");
        };
        match next {
            Some(value) => {
                attributes.borrow_mut().insert(key.to_string(), value.to_string());
            }
            None => {
                attributes.borrow_mut().shift_remove(key);
            }
        }
    }

    fn set_text(&self, node: &Self::Node, value: &str) {
        match &node.0.kind {
            Kind::Text(text) => *text.borrow_mut() = value.to_string(),
            Kind::Comment(text) => *text.borrow_mut() = value.to_string(),
            Kind::Element { .. } => panic!("set_text called on an element node"),
        }
    }

    fn is_fragment(&self, _node: &Self::Node) -> bool {
        false
    }

    fn is_svg_element(&self, node: &Self::Node) -> bool {
        matches!(node.tag(), Some("svg" | "path" | "circle" | "rect" | "g" | "line" | "polygon"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_serialize_a_tree() {
        let renderer = TestRenderer;
        let div = renderer.create_element("div");
        let text = renderer.create_text("hello");
        renderer.append(&div, &text);
        assert_eq!(div.to_html(), "<div>hello</div>");
    }

    #[test]
    fn insert_before_an_anchor_places_the_node_earlier() {
        let renderer = TestRenderer;
        let div = renderer.create_element("div");
        let b = renderer.create_text("b");
        renderer.append(&div, &b);
        let a = renderer.create_text("a");
        renderer.insert(&div, &a, Some(&b));
        assert_eq!(div.to_html(), "<div>ab</div>");
    }

    #[test]
    fn remove_detaches_from_parent() {
        let renderer = TestRenderer;
        let div = renderer.create_element("div");
        let text = renderer.create_text("x");
        renderer.append(&div, &text);
        renderer.remove(&text);
        assert_eq!(div.to_html(), "<div></div>");
        assert!(text.parent().is_none());
    }

    #[test]
    fn set_attribute_none_removes_it() {
        let renderer = TestRenderer;
        let div = renderer.create_element("div");
        renderer.set_attribute(&div, "class", Some("a"), None);
        assert_eq!(div.to_html(), "<div class=\"a\"></div>");
        renderer.set_attribute(&div, "class", None, Some("a"));
        assert_eq!(div.to_html(), "<div></div>");
    }
}
