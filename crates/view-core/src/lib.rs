//! View tree, component runtime, reconciler and renderer interface for the reactive UI runtime.
//!
//! This crate has no knowledge of any concrete host; it is generic over [`renderer::HostRenderer`]
//! the same way its reactivity layer (`reactive-graph`) has no knowledge of view trees.

#![warn(missing_docs)]

mod component;
mod directive;
mod error;
mod reconciler;
mod renderer;
mod view;

pub use component::{
    inject_context, mount_component, on_activated, on_before_mount, on_before_unmount,
    on_before_update, on_deactivated, on_error_boundary, on_mounted, on_unmounted, on_updated,
    provide_context, ComponentView, Hook, TwoWayBinding,
};
pub use directive::{Directive, DirectiveBinding, DirectiveEvent};
pub use error::{ErrorSource, ViewError, ViewResult};
pub use reconciler::{reconcile_keyed_list, same_element};
pub use renderer::{HostFragment, HostRenderer};
pub use view::{
    create_view, AttrValue, CommentNode, DynamicNode, ElementNode, FragmentNode, ListNode,
    MountMode, NodeState, TextNode, ViewNode,
};
