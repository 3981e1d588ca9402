//! Component runtime: instance allocation, the render effect, lifecycle hooks, and
//! provide/inject walking the *component*-view chain (spec §4.9, `SPEC_FULL.md` §4.9).
//!
//! Grounded on the corpus's `component_scope`/untracked-render pattern (`component.rs`) for the
//! "run the body untracked, only the render effect is tracked" discipline, and on
//! `reactive-graph::context` for the provide/inject primitive this module re-targets at the
//! component-view chain instead of the raw reactive-scope chain.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hashbrown::HashMap;
use reactive_graph::{create_effect_pre, untrack, EffectScope, MaybeDyn};

use crate::error::{ErrorSource, ViewError};
use crate::renderer::HostRenderer;
use crate::view::{mount_one, CommentNode, MountMode, NodeState, ViewNode};

/// Registration-ordered lifecycle hook kinds a component may register callbacks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeUnmount,
    Unmounted,
    Activated,
    Deactivated,
    /// Runs once during a server-rendering pass, before the component's first render — spec.md's
    /// `onServerPrefetch`. A no-op hook on the client renderer; `test-renderer`/`runtime`'s host
    /// never calls `run_hooks(Hook::ServerPrefetch)`, same as `reactive-graph`'s `create_effect`
    /// never runs twice for a hook nobody triggers.
    ServerPrefetch,
}

impl Hook {
    fn tag(self) -> &'static str {
        match self {
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::BeforeUnmount => "beforeUnmount",
            Hook::Unmounted => "unmounted",
            Hook::Activated => "activated",
            Hook::Deactivated => "deactivated",
            Hook::ServerPrefetch => "serverPrefetch",
        }
    }
}

type ErrorHook<R> = Box<dyn Fn(&ViewError) -> Option<ViewNode<R>>>;

/// A stateful or stateless component instance: its scope, its render effect, its current
/// sub-view, and its lifecycle hook registry. Built by [`mount_component`].
pub struct ComponentView<R: HostRenderer> {
    pub name: &'static str,
    pub(crate) state: Cell<NodeState>,
    pub(crate) scope: EffectScope,
    pub(crate) sub_view: RefCell<Option<ViewNode<R>>>,
    renderer: R,
    /// Stable comment anchor the sub-view is (re-)inserted before, set once in [`Self::mount`].
    anchor: RefCell<Option<R::Node>>,
    /// Host parent the anchor (and, behind it, every rendered sub-view) lives under, set once in
    /// [`Self::mount`] — `report_error` needs it to mount a fallback view it installs out of band
    /// from the normal render-effect path.
    host_parent: RefCell<Option<R::Node>>,
    /// The render body, taken by [`Self::mount`] when it installs the render effect — a component
    /// is mounted exactly once, same as `ElementNode`'s one-shot `attrs` drain.
    render: RefCell<Option<Box<dyn Fn() -> ViewNode<R>>>>,
    parent: Option<Rc<ComponentView<R>>>,
    context: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    hooks: RefCell<HashMap<Hook, Vec<Box<dyn FnMut()>>>>,
    on_error: RefCell<Option<ErrorHook<R>>>,
    /// Set while `report_error` is running this component's own `on_error` handler. Guards
    /// against the handler itself raising another error and recursing back into `report_error` on
    /// the same instance (spec §7: "repeated errors inside onError are caught and logged to
    /// prevent infinite loops").
    reporting_error: Cell<bool>,
}

thread_local! {
    /// Process-wide stack of component-view ancestors, mirroring `reactive-graph`'s thread-local
    /// scope stack but walking *component* nodes per spec's explicit wording.
    static CURRENT_COMPONENT: RefCell<Vec<Rc<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

fn current_component<R: HostRenderer>() -> Option<Rc<ComponentView<R>>> {
    CURRENT_COMPONENT.with(|s| {
        s.borrow()
            .last()
            .and_then(|rc| rc.clone().downcast::<ComponentView<R>>().ok())
    })
}

impl<R: HostRenderer> ComponentView<R> {
    /// Runs `f` with `self` as the active component: nested `create_component` calls see it as
    /// their parent, and `provide_context`/`inject_context` resolve against it.
    fn enter<T>(self: &Rc<Self>, f: impl FnOnce() -> T) -> T {
        CURRENT_COMPONENT.with(|s| s.borrow_mut().push(self.clone() as Rc<dyn Any>));
        let ret = f();
        CURRENT_COMPONENT.with(|s| {
            s.borrow_mut().pop();
        });
        ret
    }

    pub(crate) fn run_hooks(&self, hook: Hook) {
        let mut hooks = self.hooks.borrow_mut();
        if let Some(callbacks) = hooks.get_mut(&hook) {
            for cb in callbacks.iter_mut() {
                if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb()))
                {
                    let message = panic_message(payload.as_ref());
                    let err = ViewError::RenderFailure { component: self.name, message };
                    if !self.report_error(err) {
                        self.install_fallback(ViewNode::Comment(CommentNode::new(
                            self.renderer.clone(),
                            self.name,
                        )));
                    }
                }
            }
        }
    }

    /// Mounts `fallback` before our own anchor and retires whatever sub-view was there, as our
    /// own replacement content — used both when our own `on_error` handler accepts an error and
    /// when no handler anywhere accepted it (spec §7: "replace the failing sub-view with a
    /// placeholder comment containing the component name").
    fn install_fallback(&self, fallback: ViewNode<R>) {
        fallback.init();
        if let (Some(parent), Some(anchor)) =
            (self.host_parent.borrow().as_ref(), self.anchor.borrow().as_ref())
        {
            fallback.mount(parent, MountMode::Insert(anchor.clone()));
        }
        if let Some(prev) = self.sub_view.borrow_mut().replace(fallback) {
            prev.dispose();
        }
    }

    /// Walks `self`, then every ancestor, for the nearest handler willing to take `err`. Returns
    /// whether some handler (possibly our own) accepted it and installed a replacement view.
    ///
    /// Guarded by `reporting_error` against this component's own `on_error` handler raising (or
    /// panicking with) another error while it's still running: that second error is caught, logged,
    /// and dropped rather than re-entering this same call, which would otherwise recurse without
    /// bound if the handler keeps failing the same way every time it's invoked.
    fn report_error(&self, err: ViewError) -> bool {
        if self.reporting_error.replace(true) {
            #[cfg(feature = "trace")]
            tracing::error!(
                source = %ErrorSource::Render,
                component = self.name,
                "{err} (suppressed: raised while already handling an error on this component)"
            );
            #[cfg(not(feature = "trace"))]
            let _ = &err;
            return false;
        }
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.on_error.borrow().as_ref().and_then(|handler| handler(&err))
        }));
        self.reporting_error.set(false);
        match outcome {
            Ok(Some(fallback)) => {
                self.install_fallback(fallback);
                true
            }
            Ok(None) => match &self.parent {
                Some(parent) => parent.report_error(err),
                None => {
                    #[cfg(feature = "trace")]
                    tracing::error!(source = %ErrorSource::Render, component = self.name, "{err}");
                    #[cfg(not(feature = "trace"))]
                    let _ = &err;
                    false
                }
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                #[cfg(feature = "trace")]
                tracing::error!(
                    source = %ErrorSource::Render,
                    component = self.name,
                    "onError handler panicked: {message}"
                );
                #[cfg(not(feature = "trace"))]
                let _ = message;
                false
            }
        }
    }

    /// Mounts a comment anchor synchronously, then installs the render effect that builds and
    /// (re-)inserts the sub-view before that anchor — mirroring `DynamicNode::mount`'s pattern,
    /// since render is `pre`-scheduled and its first run, same as every rerun, is deferred to the
    /// next flush rather than happening inline here.
    pub(crate) fn mount(self: &Rc<Self>, parent: &R::Node, mode: MountMode<R>) {
        self.run_hooks(Hook::BeforeMount);

        let anchor = self.renderer.create_comment("");
        mount_one(&self.renderer, parent, &anchor, mode);
        *self.anchor.borrow_mut() = Some(anchor.clone());
        *self.host_parent.borrow_mut() = Some(parent.clone());

        let render = self.render.borrow_mut().take().expect("mount runs exactly once");
        let parent = parent.clone();
        let this = self.clone();
        self.scope.run(|| {
            untrack(|| {
                create_effect_pre(move || {
                    this.run_hooks(Hook::BeforeUpdate);
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        this.clone().enter(|| render())
                    }));
                    match result {
                        Ok(view) => {
                            view.init();
                            view.mount(&parent, MountMode::Insert(anchor.clone()));
                            if let Some(prev) = this.sub_view.borrow_mut().replace(view) {
                                prev.dispose();
                            }
                        }
                        // Our own render panicked; each component's render runs as its own
                        // scheduled job (not nested inside its parent's call frame), so by the time
                        // this job runs its parent's own render job has already completed. Bubbling
                        // the error is therefore a plain logical walk up `parent`, not a stack
                        // unwind: `report_error` checks our own handler first, then walks upward.
                        Err(payload) => {
                            let err = ViewError::RenderFailure {
                                component: this.name,
                                message: panic_message(payload.as_ref()),
                            };
                            if !this.report_error(err) {
                                this.install_fallback(ViewNode::Comment(CommentNode::new(
                                    this.renderer.clone(),
                                    this.name,
                                )));
                            }
                        }
                    }
                    this.run_hooks(Hook::Updated);
                });
            });
        });

        self.state.set(NodeState::Mounted);
        self.run_hooks(Hook::Mounted);
    }

    pub(crate) fn dispose(&self) {
        self.run_hooks(Hook::BeforeUnmount);
        if let Some(view) = self.sub_view.borrow_mut().take() {
            view.dispose();
        }
        self.scope.clone().dispose();
        if let Some(anchor) = self.anchor.borrow_mut().take() {
            self.renderer.remove(&anchor);
        }
        self.run_hooks(Hook::Unmounted);
    }

    /// Registers a hook callback in registration order.
    pub fn on_hook(&self, hook: Hook, f: impl FnMut() + 'static) {
        self.hooks.borrow_mut().entry(hook).or_default().push(Box::new(f));
    }

    /// Registers the nearest error-handling hook; see spec §4.9/§7 propagation rules.
    pub fn on_error(&self, f: impl Fn(&ViewError) -> Option<ViewNode<R>> + 'static) {
        *self.on_error.borrow_mut() = Some(Box::new(f));
    }

    fn provide<T: 'static>(&self, value: T) {
        self.context.borrow_mut().insert(TypeId::of::<T>(), Rc::new(value));
    }

    fn inject<T: Clone + 'static>(&self) -> Option<T> {
        if let Some(value) = self.context.borrow().get(&TypeId::of::<T>()) {
            return value.downcast_ref::<T>().cloned();
        }
        self.parent.as_ref().and_then(|p| p.inject())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "component panicked".to_string())
}

/// Stashes `value` on the currently-running component, visible to [`inject_context`] called from
/// this component or any component nested inside it. A no-op outside of any component.
pub fn provide_context<T: 'static, R: HostRenderer>(value: T) {
    if let Some(current) = current_component::<R>() {
        current.provide(value);
    }
}

/// Walks up the component-view chain for the nearest `provide_context::<T>` ancestor.
pub fn inject_context<T: Clone + 'static, R: HostRenderer>() -> Option<T> {
    current_component::<R>().and_then(|c| c.inject())
}

/// Registers `f` to run on the named lifecycle transition of the currently-rendering component. A
/// no-op outside of a component body, same as [`provide_context`]/[`on_error_boundary`].
fn on_hook<R: HostRenderer>(hook: Hook, f: impl FnMut() + 'static) {
    if let Some(current) = current_component::<R>() {
        current.on_hook(hook, f);
    }
}

/// Runs `f` just before the component's first render (spec's `onBeforeMount`).
pub fn on_before_mount<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::BeforeMount, f);
}

/// Runs `f` once the component's sub-view is first mounted into the host tree (`onMounted`).
pub fn on_mounted<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::Mounted, f);
}

/// Runs `f` just before a rerender (`onBeforeUpdate`).
pub fn on_before_update<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::BeforeUpdate, f);
}

/// Runs `f` just after a rerender's sub-view has been (re-)mounted (`onUpdated`).
pub fn on_updated<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::Updated, f);
}

/// Runs `f` just before the component is disposed (`onBeforeUnmount`).
pub fn on_before_unmount<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::BeforeUnmount, f);
}

/// Runs `f` once the component has finished disposing (`onUnmounted`).
pub fn on_unmounted<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::Unmounted, f);
}

/// Runs `f` when a deactivated (keep-alive) component is reactivated (`onActivated`).
pub fn on_activated<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::Activated, f);
}

/// Runs `f` when the component is deactivated rather than disposed (`onDeactivated`).
pub fn on_deactivated<R: HostRenderer>(f: impl FnMut() + 'static) {
    on_hook::<R>(Hook::Deactivated, f);
}

/// Registers `f` as the currently-rendering component's error boundary (spec §4.9/§7): if a
/// descendant component's render panics and nothing nearer catches it, `f` runs and its return
/// value, if any, replaces *this* component's sub-view. Must be called from inside a component's
/// render body, before constructing any child that might panic — a no-op outside of one.
pub fn on_error_boundary<R: HostRenderer>(f: impl Fn(&ViewError) -> Option<ViewNode<R>> + 'static) {
    if let Some(current) = current_component::<R>() {
        current.on_error(f);
    }
}

/// Allocates a component instance bound to `renderer`. The render body runs untracked the same
/// way a plain function call would (spec §4.9: `createComponentInstance`'s one-time setup is
/// untracked, mirroring the corpus's `component_scope`); only the render effect installed by
/// [`ComponentView::mount`] re-tracks on each rerun. Returns a handle usable for `on_hook`/
/// `on_error` before the view tree is ever mounted.
pub fn mount_component<R, P>(
    renderer: R,
    name: &'static str,
    props: P,
    render: impl Fn(&P) -> ViewNode<R> + 'static,
) -> Rc<ComponentView<R>>
where
    R: HostRenderer,
    P: 'static,
{
    let boxed_render: Box<dyn Fn() -> ViewNode<R>> = Box::new(move || render(&props));
    let component = Rc::new(ComponentView {
        name,
        state: Cell::new(NodeState::Detached),
        scope: EffectScope::new(),
        sub_view: RefCell::new(None),
        renderer,
        anchor: RefCell::new(None),
        host_parent: RefCell::new(None),
        render: RefCell::new(Some(boxed_render)),
        parent: current_component::<R>(),
        context: RefCell::new(HashMap::new()),
        hooks: RefCell::new(HashMap::new()),
        on_error: RefCell::new(None),
        reporting_error: Cell::new(false),
    });

    component.state.set(NodeState::Initialized);
    component
}

/// A two-way binding cell: reading returns the current prop value, writing calls the
/// parent-supplied `on_update` handler (spec §4.9's `v-model`-style two-way binding helper).
pub struct TwoWayBinding<T: Clone + 'static> {
    value: MaybeDyn<T>,
    on_update: Rc<dyn Fn(T)>,
}

impl<T: Clone + Into<MaybeDyn<T>> + 'static> TwoWayBinding<T> {
    pub fn new(value: impl Into<MaybeDyn<T>>, on_update: impl Fn(T) + 'static) -> Self {
        Self { value: value.into(), on_update: Rc::new(on_update) }
    }

    pub fn get(&self) -> T {
        self.value.get_clone()
    }

    pub fn set(&self, value: T) {
        (self.on_update)(value);
    }
}
