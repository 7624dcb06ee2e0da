//! Error types for pi-update.

use std::time::Duration;
use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur during update operations.
///
/// None of these are fatal to the host: the public surfaces of the cache and
/// registry client turn them into "absent" and the controller turns install
/// failures into user-visible notifications.
#[derive(Debug, Error)]
pub enum UpdateError {
    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Registry returned error {status}: {url}")]
    ServerError { status: u16, url: String },

    #[error("Registry response has no version field")]
    MissingVersion,

    // Installation errors
    #[error("Failed to run {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("{program} did not finish within {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    // File system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Cancelled
    #[error("Update cancelled by user")]
    Cancelled,
}

impl UpdateError {
    /// Check if this error came from talking to the registry.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::ServerError { .. } | Self::MissingVersion
        )
    }

    /// Check if this error is a timeout, either of a request or a child process.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout(),
            Self::CommandTimeout { .. } => true,
            _ => false,
        }
    }
}
