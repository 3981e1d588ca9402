//! Error taxonomy for the reactive graph.

use std::fmt;

/// Errors produced by the reactive graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Operation attempted on a node (signal, computed, effect, scope) that has already been
    /// disposed.
    UseAfterDispose { what: &'static str },
    /// A lifecycle transition was attempted from a state that does not permit it, e.g. resuming
    /// an effect that is not paused.
    IllegalState { what: &'static str, from: &'static str },
    /// A computed was re-entered while it was already being evaluated.
    CyclicComputation,
    /// An invariant of the tracker or scheduler was violated (e.g. unbalanced
    /// pause/resume-tracking calls).
    InternalError { message: &'static str },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UseAfterDispose { what } => {
                write!(f, "use after dispose: {what}")
            }
            GraphError::IllegalState { what, from } => {
                write!(f, "illegal state transition for {what}: from {from}")
            }
            GraphError::CyclicComputation => write!(f, "cyclic computation detected"),
            GraphError::InternalError { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = Result<T, GraphError>;
