//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while preparing a transcoder invocation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("FFmpeg not found in PATH: {0}")]
    NotInPath(String),

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),
}

impl MediaError {
    /// Create an executable-not-found error.
    pub fn executable_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ExecutableNotFound(path.into())
    }
}
