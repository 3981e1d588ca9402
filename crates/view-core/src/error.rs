//! Error taxonomy for the view tree, component runtime and reconciler.

use std::fmt;

use reactive_graph::GraphError;

/// The closed set of tags identifying where an error originated, mirrored onto every
/// `tracing` event so cross-cutting logging can match on it exhaustively instead of a raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Render,
    Build,
    Update,
    Hook(&'static str),
    Effect(&'static str),
    Trigger,
    Dispose,
    Directive(&'static str),
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSource::Render => write!(f, "render"),
            ErrorSource::Build => write!(f, "build"),
            ErrorSource::Update => write!(f, "update"),
            ErrorSource::Hook(name) => write!(f, "hook:{name}"),
            ErrorSource::Effect(name) => write!(f, "effect.{name}"),
            ErrorSource::Trigger => write!(f, "trigger"),
            ErrorSource::Dispose => write!(f, "dispose"),
            ErrorSource::Directive(name) => write!(f, "directive.{name}"),
        }
    }
}

/// Errors produced while building, patching or disposing a view tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// A component's render effect panicked while building its sub-view.
    RenderFailure { component: &'static str, message: String },
    /// A directive hook panicked.
    DirectiveFailure { directive: &'static str, message: String },
    /// A scheduler job belonging to a view node panicked during flush.
    SchedulerJobFailure { message: String },
    /// A public API boundary received an argument of the wrong shape (development-mode check).
    TypeViolation { what: &'static str },
    /// A lower-layer reactive-graph error surfaced while rendering (e.g. a cyclic computed read).
    Graph(GraphError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::RenderFailure { component, message } => {
                write!(f, "render failure in `{component}`: {message}")
            }
            ViewError::DirectiveFailure { directive, message } => {
                write!(f, "directive `{directive}` failed: {message}")
            }
            ViewError::SchedulerJobFailure { message } => {
                write!(f, "scheduler job failed: {message}")
            }
            ViewError::TypeViolation { what } => write!(f, "type violation: {what}"),
            ViewError::Graph(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ViewError {}

impl From<GraphError> for ViewError {
    fn from(err: GraphError) -> Self {
        ViewError::Graph(err)
    }
}

pub type ViewResult<T> = Result<T, ViewError>;
