//! Shared data models for the Vocalless batch pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Batch jobs, their options and lifecycle status
//! - Per-item result records
//! - Shared collections and publish metadata
//! - Source URL normalization

pub mod collection;
pub mod job;
pub mod result;
pub mod utils;

// Re-export common types
pub use collection::{CollectionSummary, CreatedCollection, Privacy, PublishMetadata};
pub use job::{item_progress, Job, JobId, JobOptions, JobStatus, JobSummary, PROCESSING_PROGRESS_CEILING};
pub use result::{ItemOutcome, ItemResult, PublishRef};
pub use utils::{extract_youtube_id, normalize_source_url};
