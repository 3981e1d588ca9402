//! `EffectScope`: a container that owns a set of effects, forwarding pause/resume/dispose and
//! routing escaped errors to a single handler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::effect::Effect;
use crate::node::NodeHandle;
use crate::root::{create_child_scope, Root};

struct Inner {
    node: NodeHandle,
    effects: RefCell<Vec<Effect>>,
    error_handler: RefCell<Option<Box<dyn Fn(&str, &'static str)>>>,
    on_pause: RefCell<Vec<Box<dyn Fn()>>>,
    on_resume: RefCell<Vec<Box<dyn Fn()>>>,
}

thread_local! {
    static ACTIVE_SCOPES: RefCell<Vec<Rc<Inner>>> = const { RefCell::new(Vec::new()) };
    /// Suppresses `attach_to_active_scope` regardless of what's on `ACTIVE_SCOPES`, so an effect
    /// can opt out of auto-attaching to the enclosing scope (`watch(..., WatchOptions { scope:
    /// false, .. })`). A `Cell<bool>` rather than a stack since nested suppression always wants
    /// the same effect (suppressed), and `without_scope_attach` restores the previous value on
    /// exit so nesting composes correctly.
    static SUPPRESS_ATTACH: Cell<bool> = const { Cell::new(false) };
}

/// Owns a set of effects created while it is the active scope (via [`EffectScope::run`]).
/// Disposing it cascades: every owned effect is disposed, then the underlying reactive-graph
/// scope (so signals/computeds allocated inside are reclaimed too).
#[derive(Clone)]
pub struct EffectScope(Rc<Inner>);

impl EffectScope {
    /// Creates a new, empty scope. Does not become active until [`Self::run`] is called.
    pub fn new() -> Self {
        let node = create_child_scope(|| {});
        EffectScope(Rc::new(Inner {
            node,
            effects: RefCell::new(Vec::new()),
            error_handler: RefCell::new(None),
            on_pause: RefCell::new(Vec::new()),
            on_resume: RefCell::new(Vec::new()),
        }))
    }

    /// Sets the handler invoked for errors escaping a child effect, as `(message, source)`.
    /// `source` is e.g. `"effect"` or `"dispose"`. Construction of a scope without ever setting
    /// one falls back to the ambient `tracing`/stderr logger, same as the scheduler's default.
    pub fn set_error_handler(&self, handler: impl Fn(&str, &'static str) + 'static) {
        *self.0.error_handler.borrow_mut() = Some(Box::new(handler));
    }

    pub(crate) fn report_error(&self, message: &str, source: &'static str) {
        if let Some(handler) = self.0.error_handler.borrow().as_ref() {
            handler(message, source);
        } else {
            #[cfg(feature = "trace")]
            tracing::error!(source, "{message}");
            #[cfg(not(feature = "trace"))]
            let _ = (message, source);
        }
    }

    /// Runs `f` with this scope active: effects created inside auto-attach to it unless created
    /// through a nested scope's own `run`.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let root = Root::global();
        let prev = root.current_node.replace(self.0.node.0);
        ACTIVE_SCOPES.with(|s| s.borrow_mut().push(self.0.clone()));
        let ret = f();
        ACTIVE_SCOPES.with(|s| {
            s.borrow_mut().pop();
        });
        root.current_node.set(prev);
        ret
    }

    /// Pauses every owned effect, then runs any callback registered via [`on_scope_pause`].
    /// Best-effort: an effect already paused or disposed is skipped rather than aborting the
    /// cascade.
    pub fn pause(&self) {
        for effect in self.0.effects.borrow().iter() {
            let _ = effect.pause();
        }
        for cb in self.0.on_pause.borrow().iter() {
            cb();
        }
    }

    /// Resumes every owned effect, then runs any callback registered via [`on_scope_resume`].
    /// Best-effort, same as [`Self::pause`].
    pub fn resume(&self) {
        for effect in self.0.effects.borrow().iter() {
            let _ = effect.resume();
        }
        for cb in self.0.on_resume.borrow().iter() {
            cb();
        }
    }

    /// Disposes every owned effect, then the underlying scope (disposing any other reactive
    /// nodes — signals, computeds, nested scopes — allocated inside [`Self::run`]).
    pub fn dispose(self) {
        for effect in self.0.effects.borrow_mut().drain(..) {
            effect.dispose();
        }
        self.0.node.dispose();
    }

    pub fn is_alive(&self) -> bool {
        self.0.node.is_alive()
    }
}

impl Default for EffectScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers `effect` with the innermost currently-running [`EffectScope::run`], if any. Called
/// automatically by [`crate::effect::create_effect_pre`]/[`crate::effect::create_effect_post`]
/// so that effects auto-attach to their enclosing scope, matching the "auto-attach unless opted
/// out" default.
pub(crate) fn attach_to_active_scope(effect: &Effect) {
    if SUPPRESS_ATTACH.with(|s| s.get()) {
        return;
    }
    ACTIVE_SCOPES.with(|s| {
        if let Some(top) = s.borrow().last() {
            top.effects.borrow_mut().push(effect.clone());
        }
    });
}

/// The innermost currently-running [`EffectScope::run`], if any. Used to capture an effect's
/// owning scope at creation time: by the time a `pre`/`post` effect actually re-runs later, the
/// `scope.run(...)` call that created it has already returned and `ACTIVE_SCOPES` has unwound
/// back past it, so the scope can't be looked up again at that point.
pub(crate) fn active_scope() -> Option<EffectScope> {
    ACTIVE_SCOPES.with(|s| s.borrow().last().cloned()).map(EffectScope)
}

/// Runs `f` with scope auto-attachment suppressed: effects created inside it do not register with
/// whatever `EffectScope` is currently active, even if one is (`watch(..., WatchOptions { scope:
/// false, .. })`).
pub(crate) fn without_scope_attach<T>(f: impl FnOnce() -> T) -> T {
    let prev = SUPPRESS_ATTACH.with(|s| s.replace(true));
    let ret = f();
    SUPPRESS_ATTACH.with(|s| s.set(prev));
    ret
}

/// Registers `f` to run whenever the current active scope is paused (spec.md's `onScopePause`).
/// No-op if there is no active scope.
pub fn on_scope_pause(f: impl Fn() + 'static) {
    ACTIVE_SCOPES.with(|s| {
        if let Some(top) = s.borrow().last() {
            top.on_pause.borrow_mut().push(Box::new(f));
        }
    });
}

/// Registers `f` to run whenever the current active scope is resumed (spec.md's `onScopeResume`).
/// No-op if there is no active scope.
pub fn on_scope_resume(f: impl Fn() + 'static) {
    ACTIVE_SCOPES.with(|s| {
        if let Some(top) = s.borrow().last() {
            top.on_resume.borrow_mut().push(Box::new(f));
        }
    });
}

#[cfg(test)]
mod tests {
    use crate::effect::create_effect_pre;
    use crate::root::create_root;
    use crate::scheduler::flush_sync;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn dispose_cascades_to_owned_effects() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let scope = EffectScope::new();
            scope.run(|| {
                create_effect_pre(move || {
                    state.track();
                    runs.update_silent(|r| *r += 1);
                });
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            scope.dispose();
            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);
        });
    }

    #[test]
    fn pause_and_resume_cascade() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let scope = EffectScope::new();
            scope.run(|| {
                create_effect_pre(move || {
                    state.track();
                    runs.update_silent(|r| *r += 1);
                });
            });
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            scope.pause();
            state.set(1);
            flush_sync();
            assert_eq!(runs.get_untracked(), 1);

            scope.resume();
            flush_sync();
            assert_eq!(runs.get_untracked(), 2);
        });
    }

    #[test]
    fn on_scope_pause_and_resume_fire_alongside_the_effect_cascade() {
        let _ = create_root(|| {
            let pauses = create_signal(0);
            let resumes = create_signal(0);
            let scope = EffectScope::new();
            scope.run(|| {
                on_scope_pause(move || pauses.update_silent(|p| *p += 1));
                on_scope_resume(move || resumes.update_silent(|r| *r += 1));
            });

            assert_eq!(pauses.get_untracked(), 0);
            scope.pause();
            assert_eq!(pauses.get_untracked(), 1);
            assert_eq!(resumes.get_untracked(), 0);

            scope.resume();
            assert_eq!(resumes.get_untracked(), 1);
        });
    }
}
