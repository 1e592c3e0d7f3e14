//! Text generation error types.

use thiserror::Error;

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation service returned no text")]
    EmptyResponse,
}
