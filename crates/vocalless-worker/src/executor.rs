//! Per-job pipeline execution.
//!
//! A run has two phases:
//! 1. Job-level preparation: publishing credentials and the shared
//!    collection. Errors here fail the whole job.
//! 2. The item loop. Each input goes through
//!    acquire → separate → enhance → render, then the optional
//!    metadata → publish → add-to-collection → cleanup steps. A primary
//!    stage error becomes a failed [`ItemResult`]; secondary step errors
//!    are recorded on the result and never change its outcome.
//!
//! Cancellation is checked before every item and every stage, and the
//! signal is handed to each media collaborator.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{warn, Instrument};
use vocalless_jobs::{CancelSignal, JobRegistry};
use vocalless_media::{MediaError, MediaResult};
use vocalless_models::{ItemResult, Job, JobId, JobOptions, PublishMetadata, PublishRef};
use vocalless_publish::Publisher;

use crate::cleanup::CleanupPolicy;
use crate::collaborators::Collaborators;
use crate::collection::{CollectionCoordinator, ResolvedCollection};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

const OPERATION: &str = "instrumental_batch";

/// One step of an item's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Separate,
    Enhance,
    Render,
    Metadata,
    Publish,
    Collection,
    Cleanup,
}

impl Stage {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Separate => "separate",
            Stage::Enhance => "enhance",
            Stage::Render => "render",
            Stage::Metadata => "metadata",
            Stage::Publish => "publish",
            Stage::Collection => "collection",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Activity shown in the job message while the stage runs.
    pub fn activity(&self) -> &'static str {
        match self {
            Stage::Acquire => "Downloading audio",
            Stage::Separate => "Separating vocals",
            Stage::Enhance => "Mastering audio",
            Stage::Render => "Rendering video",
            Stage::Metadata => "Generating metadata",
            Stage::Publish => "Publishing",
            Stage::Collection => "Adding to collection",
            Stage::Cleanup => "Cleaning up",
        }
    }

    /// Prefix of the failure detail recorded for the item.
    pub fn failure_label(&self) -> &'static str {
        match self {
            Stage::Acquire => "Download",
            Stage::Separate => "Separation",
            Stage::Enhance => "Mastering",
            Stage::Render => "Rendering",
            Stage::Metadata => "Metadata",
            Stage::Publish => "Publish",
            Stage::Collection => "Collection",
            Stage::Cleanup => "Cleanup",
        }
    }
}

/// State shared by every item of one run.
struct RunContext {
    job_id: JobId,
    options: JobOptions,
    total: usize,
    cancel: CancelSignal,
    publisher: Option<Arc<dyn Publisher>>,
    collection: Option<ResolvedCollection>,
    logger: JobLogger,
}

impl RunContext {
    fn check_cancelled(&self) -> WorkerResult<()> {
        if *self.cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }
}

/// Runs registered jobs to a terminal state.
pub struct PipelineExecutor {
    registry: Arc<JobRegistry>,
    collaborators: Collaborators,
    cleanup: CleanupPolicy,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<JobRegistry>, collaborators: Collaborators) -> Self {
        let cleanup = CleanupPolicy::new(collaborators.layout.clone());
        Self {
            registry,
            collaborators,
            cleanup,
        }
    }

    /// Run a queued job. Jobs no longer queued (e.g. cancelled while
    /// waiting) are left untouched.
    ///
    /// Only registry errors are returned; every pipeline outcome is
    /// written to the job itself.
    pub async fn run(&self, job_id: &JobId) -> WorkerResult<()> {
        let job = self.registry.get(job_id).await?;
        let logger = JobLogger::new(job_id, OPERATION);
        let span = logger.create_span();
        self.run_job(job, logger).instrument(span).await
    }

    async fn run_job(&self, job: Job, logger: JobLogger) -> WorkerResult<()> {
        let cancel = self.registry.cancellation(&job.id).await?;
        if !self.registry.update(&job.id, Job::start).await? {
            logger.log_warning(&format!("Not starting job in status {}", job.status));
            return Ok(());
        }
        metrics::record_job_started();
        logger.log_start(&format!("{} items", job.total_items));

        let mut ctx = RunContext {
            job_id: job.id.clone(),
            options: job.options.clone(),
            total: job.total_items,
            cancel,
            publisher: None,
            collection: None,
            logger,
        };

        let outcome = match self.prepare(&mut ctx).await {
            Ok(()) => self.process_items(&ctx, &job.inputs).await,
            Err(e) => Err(e),
        };
        self.finish(&ctx, outcome).await
    }

    /// Resolve credentials and the shared collection.
    async fn prepare(&self, ctx: &mut RunContext) -> WorkerResult<()> {
        if ctx.options.needs_publisher() {
            let factory = self
                .collaborators
                .publisher
                .as_ref()
                .ok_or_else(|| WorkerError::auth("no publishing credentials configured"))?;
            let publisher = factory
                .connect()
                .await
                .map_err(|e| WorkerError::auth(e.to_string()))?;
            ctx.publisher = Some(publisher);
        }
        ctx.check_cancelled()?;

        if ctx.options.wants_new_collection() {
            self.registry
                .update(&ctx.job_id, |job| job.set_message("Creating collection..."))
                .await?;
        }

        let resolved = CollectionCoordinator::new(&self.collaborators.metadata)
            .resolve(
                &ctx.options,
                self.collaborators.publisher.as_deref(),
                ctx.publisher.as_deref(),
            )
            .await?;

        if let Some(collection) = &resolved {
            let (id, url) = (collection.id.clone(), collection.url.clone());
            if !self
                .registry
                .update(&ctx.job_id, |job| job.set_collection(id, url))
                .await?
            {
                return Err(WorkerError::Cancelled);
            }
        }
        ctx.collection = resolved;
        Ok(())
    }

    async fn process_items(&self, ctx: &RunContext, inputs: &[String]) -> WorkerResult<()> {
        for (index, source) in inputs.iter().enumerate() {
            ctx.check_cancelled()?;
            if !self
                .registry
                .update(&ctx.job_id, |job| job.begin_item(index))
                .await?
            {
                return Err(WorkerError::Cancelled);
            }

            let mut title = None;
            let result = match self.process_item(ctx, index, source, &mut title).await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() || e.is_job_fatal() => return Err(e),
                Err(e) => {
                    warn!(index = index + 1, source = %source, "Item failed: {}", e);
                    let failed = ItemResult::failed(source.as_str(), e.to_string());
                    match title {
                        Some(title) => failed.with_title(title),
                        None => failed,
                    }
                }
            };

            metrics::record_item_processed(result.outcome);
            let outcome = result.outcome;
            if !self
                .registry
                .update(&ctx.job_id, |job| job.push_result(result))
                .await?
            {
                return Err(WorkerError::Cancelled);
            }
            ctx.logger
                .log_progress(&format!("item {}/{} {}", index + 1, ctx.total, outcome.as_str()));
        }
        Ok(())
    }

    /// Run one item through every stage. `title` is filled in as soon as
    /// it is known so failures can still be labelled.
    async fn process_item(
        &self,
        ctx: &RunContext,
        index: usize,
        source: &str,
        title: &mut Option<String>,
    ) -> WorkerResult<ItemResult> {
        let c = &self.collaborators;
        let layout = &c.layout;
        let cancel = || Some(ctx.cancel.clone());

        let audio = self
            .media_stage(ctx, Stage::Acquire, index, c.acquirer.acquire(source, layout, cancel()))
            .await?;
        *title = Some(audio.title.clone());

        let stems = self
            .media_stage(ctx, Stage::Separate, index, c.separator.separate(&audio, layout, cancel()))
            .await?;

        self.media_stage(ctx, Stage::Enhance, index, c.enhancer.enhance(&stems.instrumental, cancel()))
            .await?;

        let video = self
            .media_stage(
                ctx,
                Stage::Render,
                index,
                c.renderer.render(&stems.instrumental, &audio.title, layout, cancel()),
            )
            .await?;

        let mut result =
            ItemResult::succeeded(source, audio.title.as_str(), video.display().to_string());

        if ctx.options.publish {
            if let Some(publisher) = ctx.publisher.as_deref() {
                self.publish(ctx, index, publisher, &audio.title, &video, &mut result)
                    .await?;
            }
        }

        if !ctx.options.persist_locally {
            self.announce(ctx, Stage::Cleanup, index).await?;
            self.cleanup.apply_to(&audio.title, &mut result).await;
        }

        Ok(result)
    }

    /// Secondary steps: metadata, upload and collection membership.
    async fn publish(
        &self,
        ctx: &RunContext,
        index: usize,
        publisher: &dyn Publisher,
        title: &str,
        video: &Path,
        result: &mut ItemResult,
    ) -> WorkerResult<()> {
        self.announce(ctx, Stage::Metadata, index).await?;
        let metadata = self.collaborators.metadata.video_metadata(title).await;
        self.write_sidecar(title, &metadata).await;

        self.announce(ctx, Stage::Publish, index).await?;
        let started = Instant::now();
        let uploaded = publisher
            .upload_video(video, &metadata, ctx.options.privacy)
            .await;
        metrics::record_stage_duration(Stage::Publish.as_str(), started.elapsed().as_secs_f64());

        let video_id = match uploaded {
            Ok(id) => id,
            Err(e) => {
                warn!(title = %title, "Upload failed: {}", e);
                result.publish_error = Some(format!("Upload failed: {}", e));
                return Ok(());
            }
        };
        result.publish_ref = Some(PublishRef {
            url: publisher.video_url(&video_id),
            video_id: video_id.clone(),
        });

        let collection = match (&ctx.collection, ctx.options.add_to_collection) {
            (Some(collection), true) => collection,
            _ => return Ok(()),
        };

        self.announce(ctx, Stage::Collection, index).await?;
        match publisher.add_to_collection(&collection.id, &video_id).await {
            Ok(()) => result.added_to_collection = true,
            Err(e) => {
                warn!(collection_id = %collection.id, "Add to collection failed: {}", e);
                result.collection_error = Some(format!("Failed to add to collection: {}", e));
            }
        }
        Ok(())
    }

    async fn write_sidecar(&self, title: &str, metadata: &PublishMetadata) {
        let path = self.collaborators.layout.metadata_path(title);
        let written = match serde_json::to_vec_pretty(metadata) {
            Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = written {
            warn!(path = %path.display(), "Failed to write metadata sidecar: {}", e);
        }
    }

    /// Check cancellation and overwrite the job message for `stage`.
    async fn announce(&self, ctx: &RunContext, stage: Stage, index: usize) -> WorkerResult<()> {
        ctx.check_cancelled()?;
        let message = format!("{} ({}/{})", stage.activity(), index + 1, ctx.total);
        self.registry
            .update(&ctx.job_id, |job| job.set_message(message))
            .await?;
        Ok(())
    }

    async fn media_stage<T>(
        &self,
        ctx: &RunContext,
        stage: Stage,
        index: usize,
        call: impl Future<Output = MediaResult<T>>,
    ) -> WorkerResult<T> {
        self.announce(ctx, stage, index).await?;

        let started = Instant::now();
        let outcome = call.await;
        metrics::record_stage_duration(stage.as_str(), started.elapsed().as_secs_f64());

        outcome.map_err(|e| match e {
            MediaError::Cancelled => WorkerError::Cancelled,
            e => WorkerError::stage(stage.failure_label(), e.to_string()),
        })
    }

    /// Move the job to its terminal state.
    async fn finish(&self, ctx: &RunContext, outcome: WorkerResult<()>) -> WorkerResult<()> {
        let logger = &ctx.logger;
        match outcome {
            Ok(()) => {
                let completed = self.registry.update(&ctx.job_id, Job::complete).await?;
                if completed {
                    metrics::record_job_completed();
                    let job = self.registry.get(&ctx.job_id).await?;
                    logger.log_completion(&job.message);
                } else {
                    metrics::record_job_cancelled();
                    logger.log_warning("Job cancelled before completion");
                }
            }
            Err(WorkerError::Cancelled) => {
                metrics::record_job_cancelled();
                logger.log_warning("Job cancelled");
            }
            Err(WorkerError::Registry(e)) => return Err(WorkerError::Registry(e)),
            Err(e) => {
                let message = e.to_string();
                logger.log_error(&message);
                if self
                    .registry
                    .update(&ctx.job_id, |job| job.fail(message))
                    .await?
                {
                    metrics::record_job_failed();
                } else {
                    metrics::record_job_cancelled();
                }
            }
        }
        Ok(())
    }
}
