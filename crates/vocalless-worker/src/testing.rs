//! In-process fake collaborators.
//!
//! Every fake writes the files the real tool would, following the
//! [`ArtifactLayout`] naming, so cleanup and path handling are exercised
//! for real.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vocalless_jobs::JobRegistry;
use vocalless_media::{
    AcquiredAudio, ArtifactLayout, AudioEnhancer, CancelSignal, MediaAcquirer, MediaError,
    MediaResult, PlaylistExpander, SeparatedStems, SourceSeparator, VideoRenderer,
};
use vocalless_metadata::MetadataGenerator;
use vocalless_models::{CollectionSummary, Job, JobId, Privacy, PublishMetadata};
use vocalless_publish::{PublishError, PublishResult, Publisher, PublisherFactory};

use crate::collaborators::Collaborators;

/// Title the fake acquirer derives from a URL: `"Artist - <last segment>"`.
pub fn title_for(url: &str) -> String {
    let segment: String = url
        .rsplit(['/', '='])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    if segment.is_empty() {
        "Artist - Untitled".to_string()
    } else {
        format!("Artist - {}", segment)
    }
}

/// Poll until the job reaches a terminal state.
pub async fn wait_for_terminal(registry: &JobRegistry, id: &JobId) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = registry.get(id).await.expect("job registered");
        if job.is_terminal() {
            return job;
        }
        assert!(tokio::time::Instant::now() < deadline, "job {} never finished", id);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn wait_cancelled(cancel: &mut Option<CancelSignal>) {
    if let Some(rx) = cancel {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[derive(Default)]
pub struct FakeAcquirer {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeAcquirer {
    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaAcquirer for FakeAcquirer {
    async fn acquire(
        &self,
        url: &str,
        layout: &ArtifactLayout,
        _cancel: Option<CancelSignal>,
    ) -> MediaResult<AcquiredAudio> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(MediaError::command_failed("yt-dlp", "ERROR: Video unavailable", Some(1)));
        }

        layout.ensure_dirs().await?;
        let title = title_for(url);
        let audio_path = layout.temp_dir().join(format!("{}.mp3", title));
        tokio::fs::write(&audio_path, b"audio").await?;
        Ok(AcquiredAudio { title, audio_path })
    }
}

#[derive(Default)]
pub struct FakeSeparator;

#[async_trait]
impl SourceSeparator for FakeSeparator {
    async fn separate(
        &self,
        audio: &AcquiredAudio,
        layout: &ArtifactLayout,
        _cancel: Option<CancelSignal>,
    ) -> MediaResult<SeparatedStems> {
        let instrumental = layout.instrumental_path(&audio.title);
        let acapella = layout.acapella_path(&audio.title);
        tokio::fs::write(&instrumental, b"instrumental").await?;
        tokio::fs::write(&acapella, b"vocals").await?;
        tokio::fs::remove_file(&audio.audio_path).await?;
        Ok(SeparatedStems {
            instrumental,
            acapella: Some(acapella),
        })
    }
}

#[derive(Default)]
pub struct FakeEnhancer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEnhancer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioEnhancer for FakeEnhancer {
    async fn enhance(&self, _audio: &Path, _cancel: Option<CancelSignal>) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MediaError::command_failed("ffmpeg", "loudnorm: invalid input", Some(1)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    delay: Option<Duration>,
    cancelled: AtomicUsize,
}

impl FakeRenderer {
    /// Renders take `delay` unless cancelled first.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Number of renders interrupted by cancellation.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(
        &self,
        _audio: &Path,
        title: &str,
        layout: &ArtifactLayout,
        mut cancel: Option<CancelSignal>,
    ) -> MediaResult<PathBuf> {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_cancelled(&mut cancel) => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    return Err(MediaError::Cancelled);
                }
            }
        }

        let video = layout.video_path(title);
        tokio::fs::write(&video, b"video").await?;
        Ok(video)
    }
}

#[derive(Default)]
pub struct FakePublisher {
    fail_list: bool,
    fail_create: bool,
    fail_upload: bool,
    fail_add: bool,
    collections: Vec<CollectionSummary>,
    next_id: AtomicUsize,
    created: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<(PathBuf, PublishMetadata, Privacy)>>,
    added: Mutex<Vec<(String, String)>>,
}

fn remote_error(body: &str) -> PublishError {
    PublishError::RequestFailed {
        status: 500,
        body: body.to_string(),
    }
}

impl FakePublisher {
    pub fn with_collections(mut self, collections: Vec<CollectionSummary>) -> Self {
        self.collections = collections;
        self
    }

    pub fn fail_list_collections(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn fail_create_collection(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn fail_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn fail_add_to_collection(mut self) -> Self {
        self.fail_add = true;
        self
    }

    /// `(title, description)` of every created collection.
    pub fn created_collections(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, PublishMetadata, Privacy)> {
        self.uploads.lock().unwrap().clone()
    }

    /// `(collection_id, video_id)` pairs.
    pub fn added(&self) -> Vec<(String, String)> {
        self.added.lock().unwrap().clone()
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn list_collections(&self) -> PublishResult<Vec<CollectionSummary>> {
        if self.fail_list {
            return Err(remote_error("backendError"));
        }
        Ok(self.collections.clone())
    }

    async fn create_collection(
        &self,
        title: &str,
        description: &str,
        _privacy: Privacy,
    ) -> PublishResult<String> {
        if self.fail_create {
            return Err(remote_error("playlist quota exceeded"));
        }
        self.created
            .lock()
            .unwrap()
            .push((title.to_string(), description.to_string()));
        Ok(format!("PLfake{}", self.next_id()))
    }

    async fn upload_video(
        &self,
        video: &Path,
        metadata: &PublishMetadata,
        privacy: Privacy,
    ) -> PublishResult<String> {
        if self.fail_upload {
            return Err(remote_error("uploadLimitExceeded"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((video.to_path_buf(), metadata.clone(), privacy));
        Ok(format!("vid{}", self.next_id()))
    }

    async fn add_to_collection(&self, collection_id: &str, video_id: &str) -> PublishResult<()> {
        if self.fail_add {
            return Err(remote_error("playlistItemsNotAccessible"));
        }
        self.added
            .lock()
            .unwrap()
            .push((collection_id.to_string(), video_id.to_string()));
        Ok(())
    }

    fn collection_url(&self, collection_id: &str) -> String {
        format!("https://fake.test/collections/{}", collection_id)
    }

    fn video_url(&self, video_id: &str) -> String {
        format!("https://fake.test/videos/{}", video_id)
    }
}

pub struct FakePublisherFactory {
    publisher: Arc<FakePublisher>,
    fail: bool,
    connects: AtomicUsize,
}

impl FakePublisherFactory {
    pub fn new(publisher: Arc<FakePublisher>) -> Self {
        Self {
            publisher,
            fail: false,
            connects: AtomicUsize::new(0),
        }
    }

    /// Every connect fails with an auth error.
    pub fn rejecting(publisher: Arc<FakePublisher>) -> Self {
        Self {
            fail: true,
            ..Self::new(publisher)
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublisherFactory for FakePublisherFactory {
    async fn connect(&self) -> PublishResult<Arc<dyn Publisher>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PublishError::auth("invalid_grant"));
        }
        Ok(self.publisher.clone())
    }

    fn collection_url(&self, collection_id: &str) -> String {
        self.publisher.collection_url(collection_id)
    }
}

#[derive(Default)]
pub struct FakePlaylistExpander {
    playlists: HashMap<String, Vec<String>>,
}

impl FakePlaylistExpander {
    pub fn with_playlist(mut self, url: &str, members: &[&str]) -> Self {
        self.playlists.insert(
            url.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl PlaylistExpander for FakePlaylistExpander {
    async fn expand(&self, url: &str) -> MediaResult<Vec<String>> {
        self.playlists.get(url).cloned().ok_or_else(|| {
            MediaError::command_failed("yt-dlp", "ERROR: The playlist does not exist", Some(1))
        })
    }
}

/// A full set of fakes sharing one artifact root.
pub struct FakeStack {
    pub acquirer: Arc<FakeAcquirer>,
    pub enhancer: Arc<FakeEnhancer>,
    pub renderer: Arc<FakeRenderer>,
    pub publisher: Arc<FakePublisher>,
    pub factory: Arc<FakePublisherFactory>,
    pub layout: ArtifactLayout,
}

impl FakeStack {
    pub fn new(root: &Path) -> Self {
        let publisher = Arc::new(FakePublisher::default());
        Self {
            acquirer: Arc::new(FakeAcquirer::default()),
            enhancer: Arc::new(FakeEnhancer::default()),
            renderer: Arc::new(FakeRenderer::default()),
            factory: Arc::new(FakePublisherFactory::new(publisher.clone())),
            publisher,
            layout: ArtifactLayout::new(root),
        }
    }

    pub fn with_acquirer(mut self, acquirer: FakeAcquirer) -> Self {
        self.acquirer = Arc::new(acquirer);
        self
    }

    pub fn with_enhancer(mut self, enhancer: FakeEnhancer) -> Self {
        self.enhancer = Arc::new(enhancer);
        self
    }

    pub fn with_renderer(mut self, renderer: FakeRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Replace the publisher; the factory hands out the new one.
    pub fn with_publisher(mut self, publisher: FakePublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self.factory = Arc::new(FakePublisherFactory::new(self.publisher.clone()));
        self
    }

    pub fn with_rejecting_credentials(mut self) -> Self {
        self.factory = Arc::new(FakePublisherFactory::rejecting(self.publisher.clone()));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            acquirer: self.acquirer.clone(),
            separator: Arc::new(FakeSeparator),
            enhancer: self.enhancer.clone(),
            renderer: self.renderer.clone(),
            publisher: Some(self.factory.clone()),
            metadata: MetadataGenerator::canned(),
            layout: self.layout.clone(),
        }
    }
}
