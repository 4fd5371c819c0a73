//! Engine error taxonomy.
//!
//! Per-report and per-pair failures are isolated: one malformed report or
//! one failed storage write never aborts the tick for the rest of the
//! fleet.

use thiserror::Error;

use crate::storage::StorageError;
use skywatch_core::CoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed report or coordinates; the offending report is rejected
    /// and everything else proceeds.
    #[error("invalid report: {0}")]
    Validation(#[from] CoreError),

    /// Persistence failed after the bounded retry budget.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Resolve or lookup on an id with no pending notification.
    #[error("no pending notification with id {0}")]
    NotFound(String),

    /// A state that must never occur was observed; logged and contained,
    /// never fatal.
    #[error("invariant violated: {0}")]
    Invariant(String),
}
