//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{tool} failed: {message}")]
    CommandFailed {
        tool: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Expected output not found: {0}")]
    OutputMissing(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound(tool.into())
    }

    /// Create a command failure error.
    pub fn command_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            message: message.into(),
            exit_code,
        }
    }

    pub fn output_missing(path: impl Into<PathBuf>) -> Self {
        Self::OutputMissing(path.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }
}
