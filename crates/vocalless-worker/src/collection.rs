//! Shared collection resolution.

use tracing::info;
use vocalless_metadata::MetadataGenerator;
use vocalless_models::{CreatedCollection, JobOptions, Privacy};
use vocalless_publish::{Publisher, PublisherFactory};

use crate::error::{WorkerError, WorkerResult};

/// Collection a batch feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollection {
    pub id: String,
    pub url: Option<String>,
    /// True when this run created it
    pub created: bool,
}

/// Creates or adopts the shared collection before items are processed.
pub struct CollectionCoordinator<'a> {
    metadata: &'a MetadataGenerator,
}

impl<'a> CollectionCoordinator<'a> {
    pub fn new(metadata: &'a MetadataGenerator) -> Self {
        Self { metadata }
    }

    /// Resolve the collection requested by `options`, if any.
    ///
    /// An existing id is adopted without any remote call; its link comes
    /// from `factory` so no credentials are needed. Creation failure is a
    /// [`WorkerError::Collection`].
    pub async fn resolve(
        &self,
        options: &JobOptions,
        factory: Option<&dyn PublisherFactory>,
        publisher: Option<&dyn Publisher>,
    ) -> WorkerResult<Option<ResolvedCollection>> {
        if let Some(id) = options.existing_collection() {
            return Ok(Some(ResolvedCollection {
                id: id.to_string(),
                url: factory.map(|f| f.collection_url(id)),
                created: false,
            }));
        }

        if !options.wants_new_collection() {
            return Ok(None);
        }

        let publisher =
            publisher.ok_or_else(|| WorkerError::collection("no publisher available"))?;
        let created = self
            .create(publisher, &options.collection_name, None, options.privacy)
            .await?;

        Ok(Some(ResolvedCollection {
            id: created.collection_id,
            url: Some(created.collection_url),
            created: true,
        }))
    }

    /// Create a collection, generating the description when none is given.
    pub async fn create(
        &self,
        publisher: &dyn Publisher,
        title: &str,
        description: Option<&str>,
        privacy: Privacy,
    ) -> WorkerResult<CreatedCollection> {
        let title = title.trim();
        let description = match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => d.to_string(),
            None => self.metadata.collection_description(title).await,
        };

        let id = publisher
            .create_collection(title, &description, privacy)
            .await
            .map_err(|e| WorkerError::collection(e.to_string()))?;

        info!(collection_id = %id, title = %title, "Created collection");
        Ok(CreatedCollection {
            collection_url: publisher.collection_url(&id),
            collection_id: id,
        })
    }
}
