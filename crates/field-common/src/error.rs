//! Error types shared across the field-server workspace.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised by record sources and the shared metadata model.
#[derive(Debug, Error)]
pub enum FieldError {
    /// No record matched the selector.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A record handle no longer refers to a live record.
    #[error("invalid record handle: {0}")]
    InvalidHandle(u64),

    /// Failed to read record payload.
    #[error("record read failed: {0}")]
    ReadFailed(String),

    /// Record metadata is malformed or missing required fields.
    #[error("invalid record metadata: {0}")]
    InvalidMetadata(String),

    /// A level code does not decode under any known encoding.
    #[error("invalid level code: {0}")]
    InvalidLevelCode(i32),

    /// A record set mixes incompatible vertical level types.
    #[error("mixed level types in record set: {0}")]
    MixedLevelTypes(String),
}

impl FieldError {
    /// Create a RecordNotFound error.
    pub fn record_not_found(msg: impl Into<String>) -> Self {
        Self::RecordNotFound(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

// Conversion from common error types
impl From<std::io::Error> for FieldError {
    fn from(err: std::io::Error) -> Self {
        FieldError::ReadFailed(err.to_string())
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::InvalidMetadata(format!("JSON error: {}", err))
    }
}
