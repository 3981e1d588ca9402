//! Directives: named bundles of element-lifecycle hooks, applied in registration order per
//! event with per-hook error isolation (spec §4.8, §6 "Directives").

use std::rc::Rc;

use crate::error::ViewError;
use crate::renderer::HostRenderer;

/// The three lifecycle events a directive can hook into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveEvent {
    Created,
    Mounted,
    Dispose,
}

/// A value bound to a directive on a particular element: `{value, arg?, modifiers?}`.
pub struct DirectiveBinding<V> {
    pub value: V,
    pub arg: Option<&'static str>,
    pub modifiers: Vec<&'static str>,
}

type HookFn<R, V> = Rc<dyn Fn(&<R as HostRenderer>::Node, &DirectiveBinding<V>)>;

/// A directive: `{created, mounted, dispose}` hooks resolved by name (optional `v-` prefix).
pub struct Directive<R: HostRenderer, V> {
    pub name: &'static str,
    created: Option<HookFn<R, V>>,
    mounted: Option<HookFn<R, V>>,
    dispose: Option<HookFn<R, V>>,
}

impl<R: HostRenderer, V> Directive<R, V> {
    pub fn new(name: &'static str) -> Self {
        Self { name, created: None, mounted: None, dispose: None }
    }

    pub fn on_created(mut self, f: impl Fn(&R::Node, &DirectiveBinding<V>) + 'static) -> Self {
        self.created = Some(Rc::new(f));
        self
    }

    pub fn on_mounted(mut self, f: impl Fn(&R::Node, &DirectiveBinding<V>) + 'static) -> Self {
        self.mounted = Some(Rc::new(f));
        self
    }

    pub fn on_dispose(mut self, f: impl Fn(&R::Node, &DirectiveBinding<V>) + 'static) -> Self {
        self.dispose = Some(Rc::new(f));
        self
    }

    /// Invokes the hook for `event`, if registered. A panicking hook is caught and reported
    /// through `on_error` rather than propagated, isolating it from sibling directives on the
    /// same element and from the remaining lifecycle of the element itself.
    pub fn invoke(
        &self,
        event: DirectiveEvent,
        node: &R::Node,
        binding: &DirectiveBinding<V>,
        on_error: impl FnOnce(ViewError),
    ) {
        let hook = match event {
            DirectiveEvent::Created => &self.created,
            DirectiveEvent::Mounted => &self.mounted,
            DirectiveEvent::Dispose => &self.dispose,
        };
        let Some(hook) = hook else { return };
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(node, binding)));
        if let Err(payload) = result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "directive hook panicked".to_string());
            on_error(ViewError::DirectiveFailure { directive: self.name, message });
        }
    }
}

/// Type-erased `(Directive<R, V>, DirectiveBinding<V>)` pair: `ElementNode` holds one `Vec` of
/// these across directives of different `V` types, same reason `MaybeDyn`-style erasure shows up
/// elsewhere in this crate — a single element's directive list isn't generic over one `V`.
pub(crate) trait BoundDirective<R: HostRenderer> {
    fn invoke(&self, event: DirectiveEvent, node: &R::Node, on_error: &mut dyn FnMut(ViewError));
}

struct Binding<R: HostRenderer, V> {
    directive: Rc<Directive<R, V>>,
    binding: DirectiveBinding<V>,
}

impl<R: HostRenderer, V> BoundDirective<R> for Binding<R, V> {
    fn invoke(&self, event: DirectiveEvent, node: &R::Node, on_error: &mut dyn FnMut(ViewError)) {
        self.directive.invoke(event, node, &self.binding, |err| on_error(err));
    }
}

pub(crate) fn bind<R: HostRenderer, V: 'static>(
    directive: Rc<Directive<R, V>>,
    binding: DirectiveBinding<V>,
) -> Box<dyn BoundDirective<R>> {
    Box::new(Binding { directive, binding })
}
