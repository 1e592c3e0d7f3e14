//! Concurrency-safe job store.

use std::collections::HashMap;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use vocalless_models::{Job, JobId, JobStatus, JobSummary};

use crate::error::{JobsError, JobsResult};

/// Receiver side of a job's cancellation signal. Flips to `true` once.
pub type CancelSignal = watch::Receiver<bool>;

struct Entry {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// In-memory registry mapping job ids to jobs.
///
/// Readers always receive a cloned snapshot taken under the lock, so a
/// composite update made through [`JobRegistry::update`] is never observed
/// half-applied.
#[derive(Default)]
pub struct JobRegistry {
    entries: RwLock<HashMap<JobId, Entry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built job.
    pub async fn create(&self, job: Job) -> JobsResult<JobId> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&job.id) {
            return Err(JobsError::AlreadyExists(job.id.clone()));
        }

        let id = job.id.clone();
        let (cancel_tx, _) = watch::channel(false);
        info!(job_id = %id, total_items = job.total_items, "Registered job");
        entries.insert(id.clone(), Entry { job, cancel_tx });
        Ok(id)
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> JobsResult<Job> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .map(|e| e.job.clone())
            .ok_or_else(|| JobsError::NotFound(id.clone()))
    }

    /// Summaries of every job, oldest first.
    pub async fn list(&self) -> Vec<JobSummary> {
        let entries = self.entries.read().await;
        let mut jobs: Vec<&Job> = entries.values().map(|e| &e.job).collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs.into_iter().map(Job::summary).collect()
    }

    /// Apply `f` to a job under the write lock.
    pub async fn update<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> JobsResult<R> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| JobsError::NotFound(id.clone()))?;
        Ok(f(&mut entry.job))
    }

    /// Request cancellation.
    ///
    /// Returns the job's status afterwards: `Cancelled`, or the terminal
    /// status it had already reached.
    pub async fn cancel(&self, id: &JobId) -> JobsResult<JobStatus> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| JobsError::NotFound(id.clone()))?;

        if entry.job.cancel() {
            info!(job_id = %id, "Job cancelled");
            entry.cancel_tx.send_replace(true);
        } else {
            debug!(job_id = %id, status = %entry.job.status, "Cancel ignored for finished job");
        }
        Ok(entry.job.status)
    }

    /// Subscribe to a job's cancellation signal.
    pub async fn cancellation(&self, id: &JobId) -> JobsResult<CancelSignal> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .map(|e| e.cancel_tx.subscribe())
            .ok_or_else(|| JobsError::NotFound(id.clone()))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
