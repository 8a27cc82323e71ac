//! Document error types
//!
//! Error taxonomy shared by every document component. Errors are `Clone`
//! so one coalesced outcome can be handed to every waiter on the same key.

use thiserror::Error;

/// Unified document error type
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// Unknown identifier, identifier without content, or missing artifact
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied a value that cannot be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External tool failed to run, exited non-zero, or produced output
    /// that did not match the expected pattern
    #[error("External tool failure: {0}")]
    ExternalTool(String),

    /// Disk read/write failure or broken network stream
    #[error("IO error: {0}")]
    Io(String),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

impl From<std::io::Error> for DocumentError {
    fn from(err: std::io::Error) -> Self {
        DocumentError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for DocumentError {
    fn from(err: reqwest::Error) -> Self {
        DocumentError::Io(format!("origin request failed: {}", err))
    }
}

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ExternalTool(format!("image encoding failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for DocumentError {
    fn from(err: tokio::task::JoinError) -> Self {
        DocumentError::Internal(format!("Task join error: {}", err))
    }
}
