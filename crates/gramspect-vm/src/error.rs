//! Interpreter failure modes.

use std::time::Duration;

/// Errors that abort an interpreter run. Recoverable syntax errors in the
/// sample input are accumulated in the parse outcome instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The per-sample wall-clock budget was exhausted.
    #[error("parse exceeded its {0:?} budget")]
    ParseTimeout(Duration),

    /// The transport cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// A structural invariant did not hold at runtime.
    #[error("internal error: {0}")]
    Internal(String),
}
