//! Fine-grained reactivity core: signal graph, scheduler, effects, scopes and subscribers.
//!
//! This crate has no notion of a host tree — it's the reactive engine underneath `view-core`.

#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]

mod computed;
mod context;
mod effect;
mod error;
mod listener;
mod maybe_dyn;
mod node;
mod reactive;
mod root;
mod scheduler;
mod scope;
mod signal;
mod store;
mod utils;
mod watch;

pub use computed::{create_memo, create_selector, create_selector_with, Computed};
pub use context::{expect_context, provide_context, use_context};
pub use effect::{create_effect, create_effect_post, create_effect_pre, queue_job, Effect};
pub use error::{GraphError, GraphResult};
pub use listener::{create_listener, SignalListener};
pub use maybe_dyn::MaybeDyn;
pub use node::NodeHandle;
pub use reactive::{
    is_reactive, is_readonly, mark_raw, reactive, readonly, shallow_reactive, shallow_readonly,
    Depth, Reactive, Readonly,
};
pub use root::{
    batch, collect, create_child_scope, create_root, on_cleanup, pause_tracking, resume_tracking,
    untrack, use_current_scope, use_global_scope, CollectorMode, RootHandle,
};
pub use scheduler::{flush_sync, has_pending_jobs, next_tick, FlushMode};
pub use scope::{on_scope_pause, on_scope_resume, EffectScope};
pub use signal::{
    create_signal, is_ref, is_ref_read, ReadSignal, SharedValueRef, Signal, Unref, ValueRef,
};
pub use store::{create_store, Store};
pub use utils::{derived, on, Accessor, Trackable};
pub use watch::{
    on_watch_cleanup, watch, watch_changes, watch_effect, watch_property, Subscriber,
    WatchOptions,
};

/// Re-exports everything needed for everyday use: `use reactive_graph::prelude::*;`.
pub mod prelude {
    pub use crate::{
        batch, collect, create_child_scope, create_effect, create_effect_post, create_effect_pre,
        create_listener, create_memo, create_root, create_selector, create_selector_with,
        create_signal, create_store, expect_context, is_reactive, is_readonly, is_ref, is_ref_read,
        mark_raw, on,
        on_cleanup, on_scope_pause, on_scope_resume, on_watch_cleanup, pause_tracking,
        provide_context, queue_job, reactive, readonly, resume_tracking, shallow_reactive,
        shallow_readonly, untrack, use_context, use_current_scope, use_global_scope, watch,
        watch_changes, watch_effect, watch_property, Accessor, CollectorMode, Computed, Depth,
        Effect, EffectScope, FlushMode, GraphError, GraphResult, MaybeDyn, NodeHandle, Reactive,
        ReadSignal, Readonly, RootHandle, SharedValueRef, Signal, SignalListener, Store,
        Subscriber, Trackable, Unref, ValueRef, WatchOptions,
    };
}
