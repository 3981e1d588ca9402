//! Scheduler-integrated bridging between `async` futures and the reactive graph's scheduler.
//!
//! Grounded on the corpus's `sycamore-futures` crate: a component body may spawn a `!Send`
//! future scoped to its owning effect, aborted automatically if that effect is disposed before
//! the future resolves.

#![warn(missing_docs)]

use futures::future::abortable;
use futures::Future;
use reactive_graph::on_cleanup;

mod suspense;

pub use suspense::{
    await_suspense_current, create_suspense_scope, create_suspense_task, use_is_loading,
    use_is_loading_global, SuspenseScope,
};

/// Runs `f` inside a single-threaded local task set on non-wasm targets (where there is no
/// browser microtask queue to piggyback on); on `wasm32`, just awaits `f` directly. Normally
/// called once by the runtime facade when it boots an app, not by component code.
pub async fn provide_executor_scope<U>(f: impl Future<Output = U>) -> U {
    #[cfg(target_arch = "wasm32")]
    {
        f.await
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let local = tokio::task::LocalSet::new();
        local.run_until(f).await
    }
}

/// Spawns a `!Send` future scoped to the currently running effect/component. If that scope is
/// disposed before the future completes, it is aborted immediately, so it is impossible to
/// observe a continuation running after the reactive state it closed over has been torn down.
pub fn spawn_local_scoped(f: impl Future<Output = ()> + 'static) {
    let (abortable, handle) = abortable(f);
    on_cleanup(move || handle.abort());
    #[cfg(not(target_arch = "wasm32"))]
    tokio::task::spawn_local(abortable);
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(async move {
        let _ = abortable.await;
    });
}
