//! Error types for keyprobe operations
//!
//! Probe failures are not errors: a rejected or unreachable credential is
//! reported through [`ProbeOutcome`](crate::probe::ProbeOutcome) and grouped
//! into results. The variants here cover requests that cannot be carried out.

use thiserror::Error;

/// Main error type for keyprobe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyprobeError {
    /// Malformed or out-of-range input, rejected before any probing
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A stress job is already running for this credential
    #[error("Stress test already running for {0}")]
    Conflict(String),

    /// Unknown session or stress job
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation not allowed in the current job state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unexpected local failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeyprobeError {
    /// Shorthand for a not-found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        KeyprobeError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Check if this error is a client error (bad input or state)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, KeyprobeError::Internal(_))
    }

    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            KeyprobeError::Validation(_) => "VALIDATION",
            KeyprobeError::Conflict(_) => "CONFLICT",
            KeyprobeError::NotFound { .. } => "NOT_FOUND",
            KeyprobeError::InvalidState(_) => "INVALID_STATE",
            KeyprobeError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for KeyprobeError {
    fn from(err: serde_json::Error) -> Self {
        KeyprobeError::Internal(err.to_string())
    }
}

/// Result type alias for keyprobe operations
pub type Result<T> = std::result::Result<T, KeyprobeError>;
