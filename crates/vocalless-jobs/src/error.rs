//! Registry error types.

use thiserror::Error;
use vocalless_models::JobId;

pub type JobsResult<T> = Result<T, JobsError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobsError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already exists: {0}")]
    AlreadyExists(JobId),
}

impl JobsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, JobsError::NotFound(_))
    }
}
