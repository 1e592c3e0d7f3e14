//! Stage collaborator interfaces.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::MediaResult;
use crate::layout::ArtifactLayout;

/// Cancellation signal handed to every stage call. Flips to `true` once.
pub type CancelSignal = watch::Receiver<bool>;

/// Audio fetched for one source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredAudio {
    /// Human title of the item, used for all artifact names
    pub title: String,
    pub audio_path: PathBuf,
}

/// Tracks produced by source separation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedStems {
    pub instrumental: PathBuf,
    pub acapella: Option<PathBuf>,
}

/// Downloads the audio of a source URL.
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    async fn acquire(
        &self,
        url: &str,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<AcquiredAudio>;
}

/// Splits acquired audio into instrumental and vocal stems.
#[async_trait]
pub trait SourceSeparator: Send + Sync {
    async fn separate(
        &self,
        audio: &AcquiredAudio,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<SeparatedStems>;
}

/// Masters an audio file in place.
#[async_trait]
pub trait AudioEnhancer: Send + Sync {
    async fn enhance(&self, audio: &Path, cancel: Option<CancelSignal>) -> MediaResult<()>;
}

/// Renders the published video for an instrumental track.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(
        &self,
        audio: &Path,
        title: &str,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<PathBuf>;
}

/// Expands a collection URL (e.g. a playlist) into its member URLs.
#[async_trait]
pub trait PlaylistExpander: Send + Sync {
    async fn expand(&self, url: &str) -> MediaResult<Vec<String>>;
}
