//! Publishing error types.

use thiserror::Error;

/// Result type for publishing operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while talking to the publishing service.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PublishError {
    pub fn missing_credentials(msg: impl Into<String>) -> Self {
        Self::MissingCredentials(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True for failures caused by credentials rather than the request.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            PublishError::MissingCredentials(_)
                | PublishError::Auth(_)
                | PublishError::RequestFailed { status: 401, .. }
        )
    }
}
