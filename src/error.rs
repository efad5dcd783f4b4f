//! Error types for Zero Point.
//!
//! Governance rejections and missing entries are *not* errors: they come back
//! as structured outcomes (`WriteOutcome::Rejected`, `None`, `false`). The
//! types here cover infrastructure failures only: invalid configuration,
//! storage I/O, and the serializing runtime.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised while building configuration or requests.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Invalid irreversible marker vocabulary: {reason}")]
    InvalidMarkers {
        reason: String,
    },

    #[error("Unknown {kind} value '{value}'")]
    UnknownVariant {
        kind: &'static str,
        value: String,
    },
}

/// Errors from the serializing governance runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Runtime worker disconnected")]
    Disconnected,

    #[error("Timed out after {duration_ms}ms waiting for the runtime")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Runtime returned an unexpected response: expected {expected}")]
    UnexpectedResponse {
        expected: &'static str,
    },
}

/// Top-level error type for Zero Point.
#[derive(Debug, Error)]
pub enum ZeroPointError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ZeroPointError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Lock contention and a full runtime queue are transient; everything
    /// else will fail the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Storage(e) => e.is_lock_contention(),
            Self::Runtime(e) => matches!(e, RuntimeError::QueueFull { .. } | RuntimeError::Timeout { .. }),
        }
    }
}

/// Result type alias for Zero Point operations.
pub type ZeroPointResult<T> = Result<T, ZeroPointError>;
