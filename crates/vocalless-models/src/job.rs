//! Batch job definitions and lifecycle.
//!
//! A [`Job`] is the aggregate state of one batch request. Every mutation
//! goes through a method that checks the status state machine, so callers
//! holding a snapshot can never observe a job regress out of a terminal
//! state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ItemOutcome, ItemResult, Privacy};

/// Upper bound of the progress range reserved for per-item processing.
pub const PROCESSING_PROGRESS_CEILING: u8 = 80;

/// Progress value reported when item `index` (0-based) of `total` starts.
///
/// Equivalent to `floor(index / total * 80)`, computed in integers.
pub fn item_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = index.min(total) * PROCESSING_PROGRESS_CEILING as usize / total;
    scaled as u8
}

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Registered, waiting for its task to start
    #[default]
    Queued,
    /// Items are being processed
    Processing,
    /// Every item was attempted
    Completed,
    /// A job-level error stopped the batch
    Failed,
    /// Cancellation was requested by a client
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Transitions only move forward; terminal states accept nothing.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(
                next,
                JobStatus::Processing | JobStatus::Failed | JobStatus::Cancelled
            ),
            JobStatus::Processing => matches!(
                next,
                JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
            ),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Immutable configuration snapshot captured when a batch is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobOptions {
    /// Publish each rendered video after processing
    #[serde(default)]
    pub publish: bool,

    /// Keep rendered and intermediate artifacts on disk
    #[serde(default = "default_true")]
    pub persist_locally: bool,

    /// Create a shared collection before processing
    #[serde(default)]
    pub create_collection: bool,

    /// Add each published video to the shared collection
    #[serde(default)]
    pub add_to_collection: bool,

    /// Title of the collection to create
    #[serde(default)]
    pub collection_name: String,

    /// Reuse this collection instead of creating one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_collection_id: Option<String>,

    /// Visibility of published videos and created collections
    #[serde(default)]
    pub privacy: Privacy,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            publish: false,
            persist_locally: true,
            create_collection: false,
            add_to_collection: false,
            collection_name: String::new(),
            existing_collection_id: None,
            privacy: Privacy::default(),
        }
    }
}

impl JobOptions {
    /// Publishing credentials must be resolved before processing starts.
    pub fn needs_publisher(&self) -> bool {
        self.publish || self.create_collection
    }

    /// Existing collection id, ignoring blank values.
    pub fn existing_collection(&self) -> Option<&str> {
        self.existing_collection_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// A new collection should be created (no existing id, a name given).
    pub fn wants_new_collection(&self) -> bool {
        self.existing_collection().is_none()
            && self.create_collection
            && !self.collection_name.trim().is_empty()
    }
}

/// Aggregate state of one batch request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Source URLs in processing order
    pub inputs: Vec<String>,

    /// Options snapshot
    pub options: JobOptions,

    /// Lifecycle status
    pub status: JobStatus,

    /// Progress (0-100)
    pub progress: u8,

    /// 1-based cursor of the item being processed (0 before the first)
    pub current_index: usize,

    /// Number of inputs
    pub total_items: usize,

    /// Current activity, overwritten on every stage transition
    pub message: String,

    /// One record per finished item, in input order
    pub results: Vec<ItemResult>,

    /// Job-level failure. Serialized as `null` when unset so pollers
    /// always see the same keys.
    pub error: Option<String>,

    /// Shared collection the batch feeds
    pub collection_id: Option<String>,

    pub collection_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued job for the given inputs.
    pub fn new(inputs: Vec<String>, options: JobOptions) -> Self {
        let now = Utc::now();
        let total_items = inputs.len();

        Self {
            id: JobId::new(),
            inputs,
            options,
            status: JobStatus::Queued,
            progress: 0,
            current_index: 0,
            total_items,
            message: "Queued".to_string(),
            results: Vec::new(),
            error: None,
            collection_id: None,
            collection_url: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next.is_terminal() {
            self.finished_at = Some(self.updated_at);
        }
        true
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move from `Queued` to `Processing`.
    pub fn start(&mut self) -> bool {
        if !self.transition(JobStatus::Processing) {
            return false;
        }
        self.started_at = Some(self.updated_at);
        self.message = "Processing".to_string();
        true
    }

    /// Point the cursor at item `index` (0-based) and advance progress.
    pub fn begin_item(&mut self, index: usize) -> bool {
        if self.status != JobStatus::Processing || index >= self.total_items {
            return false;
        }
        self.current_index = index + 1;
        self.progress = self.progress.max(item_progress(index, self.total_items));
        self.message = format!("Processing item {}/{}", index + 1, self.total_items);
        self.updated_at = Utc::now();
        true
    }

    /// Overwrite the activity message while the job is still live.
    pub fn set_message(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.message = message.into();
        self.updated_at = Utc::now();
        true
    }

    /// Append the record of a finished item.
    pub fn push_result(&mut self, result: ItemResult) -> bool {
        if self.status != JobStatus::Processing || self.results.len() >= self.total_items {
            return false;
        }
        self.results.push(result);
        self.updated_at = Utc::now();
        true
    }

    /// Record the shared collection the batch feeds.
    pub fn set_collection(&mut self, id: impl Into<String>, url: Option<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.collection_id = Some(id.into());
        self.collection_url = url;
        self.updated_at = Utc::now();
        true
    }

    /// Mark job as completed.
    pub fn complete(&mut self) -> bool {
        if !self.transition(JobStatus::Completed) {
            return false;
        }
        self.progress = 100;
        self.message = format!(
            "Completed {}/{} items",
            self.succeeded_count(),
            self.total_items
        );
        true
    }

    /// Mark job as failed with a job-level error.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        let error = error.into();
        if !self.transition(JobStatus::Failed) {
            return false;
        }
        self.message = format!("Failed: {}", error);
        self.error = Some(error);
        true
    }

    /// Mark job as cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.transition(JobStatus::Cancelled) {
            return false;
        }
        self.message = "Job cancelled by user".to_string();
        true
    }

    /// Number of items that produced their primary artifact.
    pub fn succeeded_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == ItemOutcome::Succeeded)
            .count()
    }

    /// Compact projection used by job listings.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            total_items: self.total_items,
        }
    }
}

/// Compact job projection for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://youtube.com/watch?v=vid{i:08}")).collect()
    }

    #[test]
    fn test_job_creation() {
        let job = Job::new(urls(3), JobOptions::default());

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.total_items, 3);
        assert_eq!(job.current_index, 0);
        assert_eq!(job.progress, 0);
        assert!(job.results.is_empty());
        assert!(job.options.persist_locally);
    }

    #[test]
    fn test_item_progress_reserves_last_fifth() {
        assert_eq!(item_progress(0, 3), 0);
        assert_eq!(item_progress(1, 3), 26);
        assert_eq!(item_progress(2, 3), 53);
        assert_eq!(item_progress(0, 1), 0);
        assert_eq!(item_progress(9, 10), 72);
        assert_eq!(item_progress(0, 0), 0);
        assert!(item_progress(99, 100) <= PROCESSING_PROGRESS_CEILING);
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = Job::new(urls(2), JobOptions::default());

        assert!(job.start());
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.started_at.is_some());

        assert!(job.begin_item(0));
        assert!(job.push_result(ItemResult::succeeded("first", "A", "a.mp4")));
        assert!(job.begin_item(1));
        assert_eq!(job.progress, 40);
        assert!(job.push_result(ItemResult::failed("second", "boom")));

        assert!(job.complete());
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.message, "Completed 1/2 items");
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_terminal_states_never_regress() {
        let mut job = Job::new(urls(1), JobOptions::default());
        job.start();
        assert!(job.cancel());

        assert!(!job.complete());
        assert!(!job.fail("late"));
        assert!(!job.start());
        assert!(!job.set_message("Rendering video (1/1)"));
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.message, "Job cancelled by user");
        assert!(job.error.is_none());
    }

    #[test]
    fn test_collection_not_recorded_after_cancel() {
        let mut job = Job::new(urls(1), JobOptions::default());
        job.start();
        assert!(job.cancel());

        assert!(!job.set_collection("PLlate", Some("https://example.com/PLlate".into())));
        assert!(job.collection_id.is_none());
        assert!(job.collection_url.is_none());
    }

    #[test]
    fn test_unset_job_fields_serialize_as_null() {
        let job = Job::new(urls(1), JobOptions::default());
        let value = serde_json::to_value(&job).unwrap();

        for key in ["error", "collection_id", "collection_url"] {
            assert!(value.get(key).is_some_and(|v| v.is_null()), "{key}");
        }
    }

    #[test]
    fn test_fail_sets_error_and_message() {
        let mut job = Job::new(urls(1), JobOptions::default());
        job.start();
        assert!(job.fail("Publishing auth failed: no token"));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Publishing auth failed: no token"));
        assert_eq!(job.message, "Failed: Publishing auth failed: no token");
        assert_ne!(job.progress, 100);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = Job::new(urls(4), JobOptions::default());
        job.start();
        job.begin_item(2);
        let p = job.progress;
        job.begin_item(1);
        assert_eq!(job.progress, p);
    }

    #[test]
    fn test_results_never_exceed_total() {
        let mut job = Job::new(urls(1), JobOptions::default());
        job.start();
        assert!(job.push_result(ItemResult::failed("a", "x")));
        assert!(!job.push_result(ItemResult::failed("b", "y")));
        assert_eq!(job.results.len(), 1);
    }

    #[test]
    fn test_mutations_rejected_before_start() {
        let mut job = Job::new(urls(1), JobOptions::default());
        assert!(!job.begin_item(0));
        assert!(!job.push_result(ItemResult::failed("a", "x")));
        assert!(!job.complete());
    }

    #[test]
    fn test_options_collection_rules() {
        let mut options = JobOptions {
            create_collection: true,
            collection_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(!options.wants_new_collection());
        assert!(options.needs_publisher());

        options.collection_name = "Instrumentals".to_string();
        assert!(options.wants_new_collection());

        options.existing_collection_id = Some("PL123".to_string());
        assert!(!options.wants_new_collection());
        assert_eq!(options.existing_collection(), Some("PL123"));

        options.existing_collection_id = Some("   ".to_string());
        assert_eq!(options.existing_collection(), None);
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: JobOptions = serde_json::from_str("{}").unwrap();
        assert!(options.persist_locally);
        assert!(!options.publish);
        assert_eq!(options.privacy, Privacy::Public);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
