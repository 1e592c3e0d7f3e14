//! Collaborator bundle handed to the executor.

use std::sync::Arc;

use vocalless_media::{
    ArtifactLayout, AudioEnhancer, DemucsSeparator, FfmpegRenderer, MediaAcquirer, MediaConfig,
    SourceSeparator, VideoRenderer, YtDlpAcquirer,
};
use vocalless_metadata::MetadataGenerator;
use vocalless_publish::PublisherFactory;

/// Every external dependency of a pipeline run.
#[derive(Clone)]
pub struct Collaborators {
    pub acquirer: Arc<dyn MediaAcquirer>,
    pub separator: Arc<dyn SourceSeparator>,
    pub enhancer: Arc<dyn AudioEnhancer>,
    pub renderer: Arc<dyn VideoRenderer>,
    /// Absent when no publishing credentials are configured
    pub publisher: Option<Arc<dyn PublisherFactory>>,
    pub metadata: MetadataGenerator,
    pub layout: ArtifactLayout,
}

impl Collaborators {
    /// CLI-backed media stages built from `config`.
    pub fn from_config(
        config: &MediaConfig,
        publisher: Option<Arc<dyn PublisherFactory>>,
        metadata: MetadataGenerator,
    ) -> Self {
        Self {
            acquirer: Arc::new(YtDlpAcquirer::new(&config.ytdlp_bin)),
            separator: Arc::new(DemucsSeparator::new(
                &config.python_bin,
                &config.demucs_model,
                &config.demucs_device,
            )),
            enhancer: config.enhancer(),
            renderer: Arc::new(FfmpegRenderer::new(&config.ffmpeg_bin)),
            publisher,
            metadata,
            layout: config.layout(),
        }
    }
}
