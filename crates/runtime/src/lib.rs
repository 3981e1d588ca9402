//! # Runtime API documentation
//!
//! This crate is the public facade over the reactive graph, view tree and reconciler, and
//! (optionally) async task bridging. It adds no behavior of its own; it exists so that a
//! consumer depends on one crate rather than wiring up `reactive-graph` and `view-core`
//! separately, the way the grounding corpus's top-level crate sits over `sycamore-reactive` and
//! `sycamore-core`.
//!
//! ## Feature flags
//!
//! - `async` — pulls in [`runtime_async`], for suspending a component body on a future.
//! - `trace` — forwards to `reactive-graph/trace` and `view-core/trace`, turning on `tracing`
//!   instrumentation of the scheduler, effects and component lifecycle.

#![warn(missing_docs)]

/// Reactive primitives: signals, effects, computed values, scopes and the scheduler.
///
/// Re-export of the [`reactive_graph`] crate.
pub mod reactive {
    pub use reactive_graph::*;
}

/// The view tree, component runtime, reconciler and renderer interface.
///
/// Re-export of the [`view_core`] crate.
pub mod view {
    pub use view_core::*;
}

/// Bridging `async` futures into component bodies and the scheduler.
///
/// Re-export of the [`runtime_async`] crate.
#[cfg(feature = "async")]
pub mod r#async {
    pub use runtime_async::*;
}

/// The runtime prelude.
///
/// ```rust
/// use runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::reactive::*;
    pub use crate::view::{
        create_view, inject_context, mount_component, on_activated, on_before_mount,
        on_before_unmount, on_before_update, on_deactivated, on_error_boundary, on_mounted,
        on_unmounted, on_updated, provide_context, reconcile_keyed_list, AttrValue, CommentNode,
        ComponentView, Directive, DirectiveBinding, DirectiveEvent, DynamicNode, ElementNode,
        ErrorSource, FragmentNode, Hook, HostFragment, HostRenderer, ListNode, MountMode,
        NodeState, TextNode, TwoWayBinding, ViewError, ViewNode,
    };
    #[cfg(feature = "async")]
    pub use crate::r#async::*;
}
