//! Typed errors for the maisoku library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Most per-item failures never reach the caller: the pipeline converts
//! them into degraded-but-valid results. Only request-level and
//! destination-schema failures surface as errors.

use thiserror::Error;

/// Errors that can occur during batch processing and publishing.
#[derive(Debug, Error)]
pub enum MaisokuError {
    /// Extraction or vision service call failed
    #[error("service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Object store operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Destination API call failed
    #[error("destination error: {0}")]
    Destination(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Service answered, but not in the expected shape
    #[error("invalid service response: {reason}")]
    InvalidResponse { reason: String },

    /// Batch rejected before any processing began
    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },

    /// Destination does not expose the required properties
    #[error("destination is missing required properties: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// Credential validation failed
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Session was abandoned by the caller
    #[error("operation cancelled")]
    Cancelled,
}

impl MaisokuError {
    /// Build a service error from any displayable message.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into().into())
    }

    /// Build a storage error from any displayable message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into().into())
    }

    /// Build a destination error from any displayable message.
    pub fn destination(message: impl Into<String>) -> Self {
        Self::Destination(message.into().into())
    }
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Token was empty after sanitization
    #[error("credential is empty")]
    EmptyCredential,

    /// Environment variable holding a credential is not set
    #[error("credential not set: {0}")]
    MissingCredential(String),
}

/// Result type alias for maisoku operations.
pub type Result<T> = std::result::Result<T, MaisokuError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
