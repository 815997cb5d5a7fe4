//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob store failures. Callers above the download resolver only log these.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage misconfigured: {0}")]
    Config(String),

    #[error("No object at {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Unauthorized(String),

    #[error("Invalid storage path: {0:?}")]
    InvalidPath(String),

    #[error("Could not resolve download URL: {0}")]
    Resolve(String),

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StorageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn resolve(msg: impl Into<String>) -> Self {
        Self::Resolve(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Reject empty paths before any request is made.
    pub fn check_path(path: &str) -> StorageResult<&str> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            Err(Self::InvalidPath(path.to_string()))
        } else {
            Ok(trimmed)
        }
    }

    /// Classify a non-success HTTP status for `path`.
    pub fn from_http_status(status: u16, path: &str, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(body.into()),
            404 => Self::NotFound(path.to_string()),
            _ => Self::Resolve(format!("status {}: {}", status, body.into())),
        }
    }
}

impl From<soundsync_models::TokenError> for StorageError {
    fn from(err: soundsync_models::TokenError) -> Self {
        Self::Unauthorized(err.0)
    }
}
