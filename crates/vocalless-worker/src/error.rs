//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Credential resolution failed; fatal for the job.
    #[error("Publishing auth failed: {0}")]
    Auth(String),

    /// Shared collection could not be created; fatal for the job.
    #[error("Failed to create collection: {0}")]
    Collection(String),

    /// A primary stage failed; fatal for the item only.
    #[error("{stage} failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Job cancelled")]
    Cancelled,

    #[error("Registry error: {0}")]
    Registry(#[from] vocalless_jobs::JobsError),
}

impl WorkerError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection(msg.into())
    }

    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Errors that end the whole job rather than one item.
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            WorkerError::Auth(_) | WorkerError::Collection(_) | WorkerError::Registry(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }
}
