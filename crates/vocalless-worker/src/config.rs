//! Worker configuration.

use vocalless_models::Privacy;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs running at once; 0 means one task per job, unbounded
    pub max_concurrent_jobs: usize,
    /// Privacy applied when a request does not name one
    pub default_privacy: Privacy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 0,
            default_privacy: Privacy::Public,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            default_privacy: std::env::var("PUBLISH_PRIVACY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}
