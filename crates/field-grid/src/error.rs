//! Error types for grid operations.

use thiserror::Error;

/// Errors that can occur in the grid layer.
#[derive(Debug, Error)]
pub enum GridError {
    /// No record or tile matched the request. Callers typically treat
    /// this as a failure sentinel, not a fatal condition.
    #[error("not found: {0}")]
    NotFound(String),

    /// Query position or level outside the grid bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A buffer allocation failed; the triggering call is aborted and
    /// prior state is left intact.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// The definition cache has no free slot. The definition is still
    /// usable, just not shared.
    #[error("definition cache exhausted (capacity {capacity})")]
    CacheExhausted { capacity: usize },

    /// Grid metadata contradicts itself, e.g. a missing tile descriptor.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Record source failure.
    #[error("record source error: {0}")]
    Source(#[from] field_common::FieldError),

    /// Coordinate transform failure.
    #[error("projection error: {0}")]
    Projection(#[from] projection::ProjectionError),
}

impl GridError {
    /// Create a NotFound error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an OutOfRange error.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Create an AllocationFailure error.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::AllocationFailure(msg.into())
    }

    /// Create an InconsistentState error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentState(msg.into())
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
