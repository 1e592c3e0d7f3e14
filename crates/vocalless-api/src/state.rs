//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use vocalless_jobs::JobRegistry;
use vocalless_media::{MediaConfig, PlaylistExpander, YtDlpPlaylistExpander};
use vocalless_metadata::{MetadataGenerator, OllamaClient, OllamaConfig};
use vocalless_publish::{PublisherFactory, YouTubeConnector};
use vocalless_worker::{Collaborators, JobDispatcher, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub media: MediaConfig,
    pub dispatcher: Arc<JobDispatcher>,
    pub registry: Arc<JobRegistry>,
    pub expander: Arc<dyn PlaylistExpander>,
    /// Absent when publishing is disabled
    pub publisher: Option<Arc<dyn PublisherFactory>>,
    pub metadata: MetadataGenerator,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        media: MediaConfig,
        dispatcher: JobDispatcher,
        expander: Arc<dyn PlaylistExpander>,
        publisher: Option<Arc<dyn PublisherFactory>>,
        metadata: MetadataGenerator,
    ) -> Self {
        Self {
            config,
            media,
            registry: dispatcher.registry().clone(),
            dispatcher: Arc::new(dispatcher),
            expander,
            publisher,
            metadata,
        }
    }

    /// Wire the CLI, YouTube and Ollama collaborators from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        let media = MediaConfig::from_env();
        let worker = WorkerConfig::from_env();

        let publishing_enabled = std::env::var("PUBLISH_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let publisher: Option<Arc<dyn PublisherFactory>> = if publishing_enabled {
            Some(Arc::new(YouTubeConnector::from_env()))
        } else {
            info!("Publishing disabled");
            None
        };

        let metadata = match OllamaClient::new(OllamaConfig::from_env()) {
            Ok(client) => MetadataGenerator::new(Arc::new(client)),
            Err(e) => {
                warn!("Text generation unavailable, using canned metadata: {}", e);
                MetadataGenerator::canned()
            }
        };

        let collaborators =
            Collaborators::from_config(&media, publisher.clone(), metadata.clone());
        let dispatcher =
            JobDispatcher::new(Arc::new(JobRegistry::new()), collaborators, &worker);
        let expander = Arc::new(YtDlpPlaylistExpander::new(&media.ytdlp_bin));

        Self::new(config, media, dispatcher, expander, publisher, metadata)
    }
}
