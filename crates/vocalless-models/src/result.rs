//! Per-item result records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether an item produced its primary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Succeeded => "succeeded",
            ItemOutcome::Failed => "failed",
        }
    }
}

/// Reference to a published video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublishRef {
    pub video_id: String,
    pub url: String,
}

/// Outcome of one input item, appended to the job once the item is finished.
///
/// Secondary steps (publish, add to collection, cleanup) record their own
/// errors here without changing the item's `outcome`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemResult {
    /// Source URL as submitted (after normalization)
    pub source: String,

    pub outcome: ItemOutcome,

    /// Human title of the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Path of the rendered video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_ref: Option<PublishRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,

    #[serde(default)]
    pub added_to_collection: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_error: Option<String>,

    #[serde(default)]
    pub cleanup_attempted: bool,

    #[serde(default)]
    pub files_deleted: bool,

    /// Cause of failure; always set when `outcome` is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
}

impl ItemResult {
    /// Record for an item whose rendered video exists.
    pub fn succeeded(
        source: impl Into<String>,
        title: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            outcome: ItemOutcome::Succeeded,
            title: Some(title.into()),
            artifact_ref: Some(artifact.into()),
            publish_ref: None,
            publish_error: None,
            added_to_collection: false,
            collection_error: None,
            cleanup_attempted: false,
            files_deleted: false,
            failure_detail: None,
        }
    }

    /// Record for an item that failed before producing its artifact.
    pub fn failed(source: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            "Processing failed".to_string()
        } else {
            detail
        };

        Self {
            source: source.into(),
            outcome: ItemOutcome::Failed,
            title: None,
            artifact_ref: None,
            publish_ref: None,
            publish_error: None,
            added_to_collection: false,
            collection_error: None,
            cleanup_attempted: false,
            files_deleted: false,
            failure_detail: Some(detail),
        }
    }

    /// Attach the title known at the time of failure.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ItemOutcome::Succeeded
    }
}
