//! Publisher interfaces.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use vocalless_models::{CollectionSummary, Privacy, PublishMetadata};

use crate::error::PublishResult;

/// Remote operations on the publishing account.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Collections owned by the account.
    async fn list_collections(&self) -> PublishResult<Vec<CollectionSummary>>;

    /// Create a collection and return its id.
    async fn create_collection(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> PublishResult<String>;

    /// Upload a video file and return its id.
    async fn upload_video(
        &self,
        video: &Path,
        metadata: &PublishMetadata,
        privacy: Privacy,
    ) -> PublishResult<String>;

    async fn add_to_collection(&self, collection_id: &str, video_id: &str) -> PublishResult<()>;

    fn collection_url(&self, collection_id: &str) -> String;

    fn video_url(&self, video_id: &str) -> String;
}

/// Resolves credentials and yields a ready publisher.
#[async_trait]
pub trait PublisherFactory: Send + Sync {
    async fn connect(&self) -> PublishResult<Arc<dyn Publisher>>;

    /// Public link of a collection. Needs no credentials.
    fn collection_url(&self, collection_id: &str) -> String;
}
