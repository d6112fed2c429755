//! Error handling for Resound
//!
//! Playback failures are never fatal: the worst outcome of any error here is
//! a dropped sound. Every error carries a stable code for host-side logging.

use thiserror::Error;

/// Result type alias for Resound operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Main error type for Resound operations
#[derive(Error, Debug)]
pub enum AudioError {
    // Input Errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AudioError {
    /// Shorthand for an [`AudioError::InvalidArgument`]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        AudioError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AudioError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            AudioError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            AudioError::InvalidConfig { .. } => "INVALID_CONFIG",
            AudioError::Io(_) => "IO_ERROR",
            AudioError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Rejected play requests only drop a sound, so the caller can keep going.
    /// Configuration and manifest failures leave the system without its setup.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AudioError::InvalidArgument { .. } | AudioError::ResourceNotFound { .. }
        )
    }
}
