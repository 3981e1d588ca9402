//! The view tree: a polymorphic tree of display units attached to a host tree.
//!
//! Grounded on the corpus's `View<G>`/`ViewType<G>` (node/dyn/fragment variants, `flatten()` to a
//! host node list, `Clone`-cheap `Rc` wrapping), widened to the eight variants and the explicit
//! per-node lifecycle this runtime's spec names, since the corpus's own `View` has no notion of
//! `init`/`mount`/`activate`/`deactivate` as distinct steps (it mounts eagerly on construction).

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use reactive_graph::{create_effect_pre, Effect, EffectScope, MaybeDyn};

use crate::component::ComponentView;
use crate::renderer::{HostFragment, HostRenderer};

/// Where a lifecycle state sits along `detached -> initialized -> mounted -> {deactivated} ->
/// disposed`. `host-node exists iff state >= Mounted` (spec §3 `ViewNode` invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Detached,
    Initialized,
    Mounted,
    Deactivated,
    Disposed,
}

/// How a view's host node(s) should be attached to their container during `mount`.
#[derive(Clone)]
pub enum MountMode<R: HostRenderer> {
    Append,
    Insert(R::Node),
    Replace(R::Node),
}

/// A polymorphic view-tree node. Cheap to clone (each variant is `Rc`-backed), matching the
/// grounding corpus's `View<G>`.
#[derive(Clone)]
pub enum ViewNode<R: HostRenderer> {
    Text(Rc<TextNode<R>>),
    Comment(Rc<CommentNode<R>>),
    Element(Rc<ElementNode<R>>),
    Fragment(Rc<FragmentNode<R>>),
    ComponentStateful(Rc<ComponentView<R>>),
    ComponentStateless(Rc<ComponentView<R>>),
    Dynamic(Rc<DynamicNode<R>>),
    List(Rc<ListNode<R>>),
}

impl<R: HostRenderer> ViewNode<R> {
    pub fn state(&self) -> NodeState {
        match self {
            ViewNode::Text(n) => n.state.get(),
            ViewNode::Comment(n) => n.state.get(),
            ViewNode::Element(n) => n.state.get(),
            ViewNode::Fragment(n) => n.state.get(),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => n.state.get(),
            ViewNode::Dynamic(n) => n.state.get(),
            ViewNode::List(n) => n.state.get(),
        }
    }

    /// Attaches this node to a parent context: inherits the renderer and (for components) the
    /// nearest component-view ancestor used by provide/inject.
    pub fn init(&self) {
        self.set_state(NodeState::Initialized);
    }

    /// Creates/attaches the host node(s) under `parent` according to `mode`.
    pub fn mount(&self, parent: &R::Node, mode: MountMode<R>) {
        match self {
            ViewNode::Text(n) => n.mount(parent, mode),
            ViewNode::Comment(n) => n.mount(parent, mode),
            ViewNode::Element(n) => n.mount(parent, mode),
            ViewNode::Fragment(n) => n.mount(parent, mode),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => {
                n.mount(parent, mode)
            }
            ViewNode::Dynamic(n) => n.mount(parent, mode),
            ViewNode::List(n) => n.mount(parent, mode),
        }
    }

    /// Toggles the active state: pauses/resumes any effects owned by this node and its
    /// descendants, without tearing down host nodes. Used by `KeepAlive`-style collaborators.
    pub fn activate(&self) {
        self.set_state(NodeState::Mounted);
        self.for_each_scope(|scope| {
            scope.resume();
        });
        if let ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) = self {
            n.run_hooks(crate::component::Hook::Activated);
        }
    }

    pub fn deactivate(&self) {
        self.set_state(NodeState::Deactivated);
        self.for_each_scope(|scope| {
            scope.pause();
        });
        if let ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) = self {
            n.run_hooks(crate::component::Hook::Deactivated);
        }
    }

    /// Tears down in reverse creation order: children first, then effects, then host detach.
    pub fn dispose(&self) {
        match self {
            ViewNode::Text(n) => n.dispose(),
            ViewNode::Comment(n) => n.dispose(),
            ViewNode::Element(n) => n.dispose(),
            ViewNode::Fragment(n) => n.dispose(),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => n.dispose(),
            ViewNode::Dynamic(n) => n.dispose(),
            ViewNode::List(n) => n.dispose(),
        }
        self.set_state(NodeState::Disposed);
    }

    fn set_state(&self, state: NodeState) {
        match self {
            ViewNode::Text(n) => n.state.set(state),
            ViewNode::Comment(n) => n.state.set(state),
            ViewNode::Element(n) => n.state.set(state),
            ViewNode::Fragment(n) => n.state.set(state),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => n.state.set(state),
            ViewNode::Dynamic(n) => n.state.set(state),
            ViewNode::List(n) => n.state.set(state),
        }
    }

    fn for_each_scope(&self, f: impl Fn(&EffectScope)) {
        if let ViewNode::Element(n) = self {
            f(&n.scope);
        }
        if let ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) = self {
            f(&n.scope);
        }
        for child in self.children() {
            child.for_each_scope(&f);
        }
    }

    /// This node's immediate children, for traversal. Leaf kinds return an empty slice.
    pub fn children(&self) -> Vec<ViewNode<R>> {
        match self {
            ViewNode::Element(n) => n.children.borrow().clone(),
            ViewNode::Fragment(n) => n.children.borrow().clone(),
            ViewNode::List(n) => n.children.borrow().iter().map(|(_, v)| v.clone()).collect(),
            ViewNode::Dynamic(n) => n.current.borrow().iter().cloned().collect(),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => {
                n.sub_view.borrow().iter().cloned().collect()
            }
            ViewNode::Text(_) | ViewNode::Comment(_) => Vec::new(),
        }
    }

    /// Flattens this view into the ordered sequence of concrete host nodes it currently owns.
    /// Used by the reconciler to diff and move real nodes.
    pub fn flatten(&self) -> Vec<R::Node> {
        match self {
            ViewNode::Text(n) => n.host.borrow().iter().cloned().collect(),
            ViewNode::Comment(n) => n.host.borrow().iter().cloned().collect(),
            ViewNode::Element(n) => n.host.borrow().iter().cloned().collect(),
            ViewNode::Fragment(n) => n.children.borrow().iter().flat_map(|c| c.flatten()).collect(),
            ViewNode::ComponentStateful(n) | ViewNode::ComponentStateless(n) => n
                .sub_view
                .borrow()
                .as_ref()
                .map(|v| v.flatten())
                .unwrap_or_default(),
            ViewNode::Dynamic(n) => n
                .current
                .borrow()
                .as_ref()
                .map(|v| v.flatten())
                .unwrap_or_default(),
            ViewNode::List(n) => n.children.borrow().iter().flat_map(|(_, v)| v.flatten()).collect(),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, ViewNode::Text(_) | ViewNode::Comment(_) | ViewNode::Element(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, ViewNode::Fragment(_))
    }
}

impl<R: HostRenderer> fmt::Debug for ViewNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ViewNode::Text(_) => "Text",
            ViewNode::Comment(_) => "Comment",
            ViewNode::Element(n) => return write!(f, "Element({})", n.tag),
            ViewNode::Fragment(_) => "Fragment",
            ViewNode::ComponentStateful(n) => return write!(f, "ComponentStateful({})", n.name),
            ViewNode::ComponentStateless(n) => return write!(f, "ComponentStateless({})", n.name),
            ViewNode::Dynamic(_) => "Dynamic",
            ViewNode::List(_) => "List",
        };
        write!(f, "{tag}")
    }
}

pub(crate) fn mount_one<R: HostRenderer>(
    renderer: &R,
    parent: &R::Node,
    node: &R::Node,
    mode: MountMode<R>,
) {
    match mode {
        MountMode::Append => renderer.append(parent, node),
        MountMode::Insert(anchor) => renderer.insert(parent, node, Some(&anchor)),
        MountMode::Replace(old) => renderer.replace(node, &old),
    }
}

/// Leaf: fixed text content. Patch replaces `node_value` wholesale.
pub struct TextNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    host: RefCell<Option<R::Node>>,
    text: RefCell<String>,
}

impl<R: HostRenderer> TextNode<R> {
    pub fn new(renderer: R, text: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            host: RefCell::new(None),
            text: RefCell::new(text.into()),
        })
    }

    fn mount(&self, parent: &R::Node, mode: MountMode<R>) {
        let node = self.renderer.create_text(&self.text.borrow());
        mount_one(&self.renderer, parent, &node, mode);
        *self.host.borrow_mut() = Some(node);
        self.state.set(NodeState::Mounted);
    }

    /// Overwrites the text content; no-op if the value is unchanged.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        if *self.text.borrow() == text {
            return;
        }
        if let Some(host) = self.host.borrow().as_ref() {
            self.renderer.set_text(host, &text);
        }
        *self.text.borrow_mut() = text;
    }

    fn dispose(&self) {
        if let Some(host) = self.host.borrow_mut().take() {
            self.renderer.remove(&host);
        }
    }
}

/// Leaf: placeholder anchor, used by `Dynamic`/list views to mark a stable position.
pub struct CommentNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    host: RefCell<Option<R::Node>>,
    text: RefCell<String>,
}

impl<R: HostRenderer> CommentNode<R> {
    pub fn new(renderer: R, text: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            host: RefCell::new(None),
            text: RefCell::new(text.into()),
        })
    }

    fn mount(&self, parent: &R::Node, mode: MountMode<R>) {
        let node = self.renderer.create_comment(&self.text.borrow());
        mount_one(&self.renderer, parent, &node, mode);
        *self.host.borrow_mut() = Some(node);
        self.state.set(NodeState::Mounted);
    }

    pub fn host(&self) -> Option<R::Node> {
        self.host.borrow().clone()
    }

    fn dispose(&self) {
        if let Some(host) = self.host.borrow_mut().take() {
            self.renderer.remove(&host);
        }
    }
}

/// A single element attribute/property: either a constant or a reactive getter. Spec §4.8's
/// "element props effect" installs one tracked write per key.
pub type AttrValue = MaybeDyn<Cow<'static, str>>;

/// Host element: owns its attribute effects and its children.
pub struct ElementNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    host: RefCell<Option<R::Node>>,
    tag: String,
    attrs: RefCell<Vec<(Cow<'static, str>, AttrValue)>>,
    /// Attribute-effects and the owning scope they (and any directive hooks) are paused/resumed
    /// with, per spec §4.8.
    scope: EffectScope,
    children: RefCell<Vec<ViewNode<R>>>,
    /// Bound directives in registration order, drained into `created`/`mounted` invocations by
    /// `mount` and `dispose` invocations by `dispose` (spec §4.8's per-element directive list).
    directives: RefCell<Vec<Box<dyn crate::directive::BoundDirective<R>>>>,
}

/// Builds an element view node for `tag`, with `props` applied as attributes in order (spec's
/// `createView(tag, props)` element case). The component half of `createView(tag|component,
/// props)` is [`crate::component::mount_component`]: a component constructor is a distinct generic
/// function per its own props type `P`, so one function can't unify both cases the way the spec's
/// single dynamically-typed `createView` does — callers already know statically which case they're
/// in, so they call the matching constructor directly instead.
pub fn create_view<R: HostRenderer>(
    renderer: R,
    tag: impl Into<String>,
    props: impl IntoIterator<Item = (Cow<'static, str>, AttrValue)>,
) -> ViewNode<R> {
    let element = ElementNode::new(renderer, tag);
    for (key, value) in props {
        element.set_attr(key, value);
    }
    ViewNode::Element(element)
}

impl<R: HostRenderer> ElementNode<R> {
    pub fn new(renderer: R, tag: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            host: RefCell::new(None),
            tag: tag.into(),
            attrs: RefCell::new(Vec::new()),
            scope: EffectScope::new(),
            children: RefCell::new(Vec::new()),
            directives: RefCell::new(Vec::new()),
        })
    }

    /// This element's host tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_attr(&self, key: impl Into<Cow<'static, str>>, value: AttrValue) {
        self.attrs.borrow_mut().push((key.into(), value));
    }

    pub fn push_child(&self, child: ViewNode<R>) {
        self.children.borrow_mut().push(child);
    }

    /// Binds `directive` to this element with `binding`; its `created`/`mounted`/`dispose` hooks
    /// fire as this element goes through those lifecycle points.
    pub fn add_directive<V: 'static>(
        &self,
        directive: Rc<crate::directive::Directive<R, V>>,
        binding: crate::directive::DirectiveBinding<V>,
    ) {
        self.directives.borrow_mut().push(crate::directive::bind(directive, binding));
    }

    fn run_directive_hooks(&self, event: crate::directive::DirectiveEvent, node: &R::Node) {
        for directive in self.directives.borrow().iter() {
            directive.invoke(event, node, &mut |err| {
                #[cfg(feature = "trace")]
                tracing::error!("{err}");
                #[cfg(not(feature = "trace"))]
                let _ = err;
            });
        }
    }

    fn mount(&self, parent: &R::Node, mode: MountMode<R>) {
        let node = self.renderer.create_element(&self.tag);
        self.run_directive_hooks(crate::directive::DirectiveEvent::Created, &node);
        mount_one(&self.renderer, parent, &node, mode);

        let attrs = std::mem::take(&mut *self.attrs.borrow_mut());
        self.scope.run(|| {
            for (key, value) in attrs {
                let renderer = self.renderer.clone();
                let node = node.clone();
                let prev = Rc::new(RefCell::new(None::<String>));
                create_effect_pre({
                    let prev = prev.clone();
                    move || {
                        let next = value.get_clone();
                        let prev_value = prev.borrow_mut().replace(next.to_string());
                        renderer.set_attribute(&node, &key, Some(&next), prev_value.as_deref());
                    }
                });
            }
        });

        for child in self.children.borrow().iter() {
            child.init();
            child.mount(&node, MountMode::Append);
        }

        self.run_directive_hooks(crate::directive::DirectiveEvent::Mounted, &node);
        *self.host.borrow_mut() = Some(node);
        self.state.set(NodeState::Mounted);
    }

    fn dispose(&self) {
        for child in self.children.borrow().iter() {
            child.dispose();
        }
        self.scope.clone().dispose();
        if let Some(host) = self.host.borrow_mut().take() {
            self.run_directive_hooks(crate::directive::DirectiveEvent::Dispose, &host);
            self.renderer.remove(&host);
        }
    }
}

/// Ordered group of children bracketed by start/end comment anchors in the host tree.
pub struct FragmentNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    fragment: RefCell<Option<HostFragment<R::Node>>>,
    children: RefCell<Vec<ViewNode<R>>>,
}

impl<R: HostRenderer> FragmentNode<R> {
    pub fn new(renderer: R, children: Vec<ViewNode<R>>) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            fragment: RefCell::new(None),
            children: RefCell::new(children),
        })
    }

    fn mount(&self, parent: &R::Node, mode: MountMode<R>) {
        let frag = self.renderer.create_fragment();
        mount_one(&self.renderer, parent, &frag.start, mode);
        self.renderer.insert(parent, &frag.end, None);
        let end = frag.end.clone();
        for child in self.children.borrow().iter() {
            child.init();
            child.mount(parent, MountMode::Insert(end.clone()));
        }
        *self.fragment.borrow_mut() = Some(frag);
        self.state.set(NodeState::Mounted);
    }

    fn dispose(&self) {
        for child in self.children.borrow().iter() {
            child.dispose();
        }
        if let Some(frag) = self.fragment.borrow_mut().take() {
            self.renderer.remove(&frag.start);
            self.renderer.remove(&frag.end);
        }
    }
}

/// Holds a reactive source that yields a view; patches in place on source change.
pub struct DynamicNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    source: RefCell<Box<dyn FnMut() -> ViewNode<R>>>,
    current: RefCell<Option<ViewNode<R>>>,
    anchor: RefCell<Option<R::Node>>,
    effect: RefCell<Option<Effect>>,
}

impl<R: HostRenderer> DynamicNode<R> {
    pub fn new(renderer: R, source: impl FnMut() -> ViewNode<R> + 'static) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            source: RefCell::new(Box::new(source)),
            current: RefCell::new(None),
            anchor: RefCell::new(None),
            effect: RefCell::new(None),
        })
    }

    fn mount(self: &Rc<Self>, parent: &R::Node, mode: MountMode<R>) {
        let anchor = self.renderer.create_comment("");
        mount_one(&self.renderer, parent, &anchor, mode);
        *self.anchor.borrow_mut() = Some(anchor.clone());

        let this = self.clone();
        let parent = parent.clone();
        let effect = create_effect_pre(move || {
            let next = (this.source.borrow_mut())();
            next.init();
            let prev = this.current.borrow_mut().take();
            // Same tag on both sides: swap the host node in place via `Replace` rather than
            // inserting the new one at the anchor and then tearing the old one out separately —
            // fewer host-tree mutations for what's otherwise the exact same re-render case.
            let reuse_host = prev
                .as_ref()
                .filter(|p| crate::reconciler::same_element(p, &next))
                .and_then(|p| p.flatten().into_iter().next());
            match reuse_host {
                Some(old_host) => next.mount(&parent, MountMode::Replace(old_host)),
                None => next.mount(&parent, MountMode::Insert(anchor.clone())),
            }
            if let Some(prev) = prev {
                prev.dispose();
            }
            *this.current.borrow_mut() = Some(next);
        });
        *self.effect.borrow_mut() = Some(effect);
        self.state.set(NodeState::Mounted);
    }

    fn dispose(&self) {
        if let Some(effect) = self.effect.borrow_mut().take() {
            effect.dispose();
        }
        if let Some(current) = self.current.borrow_mut().take() {
            current.dispose();
        }
        if let Some(anchor) = self.anchor.borrow_mut().take() {
            self.renderer.remove(&anchor);
        }
    }
}

type KeysSource = dyn FnMut() -> Vec<u64>;
type ItemBuilder<R> = dyn FnMut(u64) -> ViewNode<R>;

/// Keyed ordered children, diffed by the reconciler's LIS move algorithm on re-render.
///
/// Constructed either with a fixed set of children ([`ListNode::new`]) or with a reactive key
/// source plus item builder ([`ListNode::new_reactive`]); the latter installs a `pre`-queue
/// effect that re-diffs via [`crate::reconciler::reconcile_keyed_list`] on each dependency
/// change, matching spec §4.10's "diffed with LIS move algorithm" for `ListView`.
pub struct ListNode<R: HostRenderer> {
    renderer: R,
    state: Cell<NodeState>,
    fragment: RefCell<Option<HostFragment<R::Node>>>,
    children: RefCell<Vec<(u64, ViewNode<R>)>>,
    source: RefCell<Option<Box<KeysSource>>>,
    build: RefCell<Option<Box<ItemBuilder<R>>>>,
    effect: RefCell<Option<Effect>>,
}

impl<R: HostRenderer> ListNode<R> {
    pub fn new(renderer: R, children: Vec<(u64, ViewNode<R>)>) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            fragment: RefCell::new(None),
            children: RefCell::new(children),
            source: RefCell::new(None),
            build: RefCell::new(None),
            effect: RefCell::new(None),
        })
    }

    /// Builds a list whose keys are recomputed by `source` on every dependency change, each new
    /// key materialized into a view by `build` (existing keys keep their view, per the
    /// reconciler's LIS move algorithm rather than being rebuilt).
    pub fn new_reactive(
        renderer: R,
        source: impl FnMut() -> Vec<u64> + 'static,
        build: impl FnMut(u64) -> ViewNode<R> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            renderer,
            state: Cell::new(NodeState::Detached),
            fragment: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            source: RefCell::new(Some(Box::new(source))),
            build: RefCell::new(Some(Box::new(build))),
            effect: RefCell::new(None),
        })
    }

    pub fn fragment_anchors(&self) -> Option<HostFragment<R::Node>> {
        self.fragment.borrow().clone()
    }

    pub fn children_mut(&self) -> std::cell::RefMut<'_, Vec<(u64, ViewNode<R>)>> {
        self.children.borrow_mut()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn mount(self: &Rc<Self>, parent: &R::Node, mode: MountMode<R>) {
        let frag = self.renderer.create_fragment();
        mount_one(&self.renderer, parent, &frag.start, mode);
        self.renderer.insert(parent, &frag.end, None);
        let end = frag.end.clone();
        for (_, child) in self.children.borrow().iter() {
            child.init();
            child.mount(parent, MountMode::Insert(end.clone()));
        }
        *self.fragment.borrow_mut() = Some(frag);
        self.state.set(NodeState::Mounted);

        if self.source.borrow().is_some() {
            let this = self.clone();
            let parent = parent.clone();
            let effect = create_effect_pre(move || {
                let new_keys = (this.source.borrow_mut().as_mut().unwrap())();
                let old = std::mem::take(&mut *this.children.borrow_mut());
                let end = this
                    .fragment
                    .borrow()
                    .as_ref()
                    .map(|frag| frag.end.clone())
                    .expect("fragment installed before the effect runs");
                let mut build = this.build.borrow_mut();
                let build = build.as_mut().unwrap();
                let new_children = crate::reconciler::reconcile_keyed_list(
                    &this.renderer,
                    &parent,
                    old,
                    new_keys,
                    |key| build(key),
                    Some(&end),
                );
                *this.children.borrow_mut() = new_children;
            });
            *self.effect.borrow_mut() = Some(effect);
        }
    }

    fn dispose(&self) {
        if let Some(effect) = self.effect.borrow_mut().take() {
            effect.dispose();
        }
        for (_, child) in self.children.borrow().iter() {
            child.dispose();
        }
        if let Some(frag) = self.fragment.borrow_mut().take() {
            self.renderer.remove(&frag.start);
            self.renderer.remove(&frag.end);
        }
    }
}
