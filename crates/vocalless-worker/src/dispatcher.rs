//! Job submission and task supervision.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use vocalless_jobs::JobRegistry;
use vocalless_models::{Job, JobId, Privacy};

use crate::collaborators::Collaborators;
use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::executor::PipelineExecutor;

const PANIC_MESSAGE: &str = "Pipeline task panicked";

/// Registers jobs and runs each one on its own task.
pub struct JobDispatcher {
    registry: Arc<JobRegistry>,
    executor: Arc<PipelineExecutor>,
    /// Gates task start when a job bound is configured
    permits: Option<Arc<Semaphore>>,
    default_privacy: Privacy,
}

impl JobDispatcher {
    pub fn new(
        registry: Arc<JobRegistry>,
        collaborators: Collaborators,
        config: &WorkerConfig,
    ) -> Self {
        let permits = (config.max_concurrent_jobs > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent_jobs)));

        Self {
            executor: Arc::new(PipelineExecutor::new(registry.clone(), collaborators)),
            registry,
            permits,
            default_privacy: config.default_privacy,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn default_privacy(&self) -> Privacy {
        self.default_privacy
    }

    /// Register `job` and start its pipeline in the background.
    ///
    /// Returns as soon as the job is registered; it stays `Queued` until
    /// its task gets a slot.
    pub async fn submit(&self, job: Job) -> WorkerResult<JobId> {
        let job_id = self.registry.create(job).await?;

        let registry = self.registry.clone();
        let executor = self.executor.clone();
        let permits = self.permits.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            let _permit = match permits {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        error!(job_id = %id, "Job slots closed");
                        let _ = registry.update(&id, |job| job.fail("Worker shut down")).await;
                        return;
                    }
                },
                None => None,
            };
            debug!(job_id = %id, "Job slot acquired");

            // Inner task so a panic surfaces as a JoinError here.
            let run = {
                let id = id.clone();
                tokio::spawn(async move { executor.run(&id).await })
            };

            match run.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(job_id = %id, "Pipeline error: {}", e),
                Err(e) => {
                    error!(job_id = %id, "Pipeline task panicked: {}", e);
                    let _ = registry.update(&id, |job| job.fail(PANIC_MESSAGE)).await;
                }
            }
        });

        info!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }
}
