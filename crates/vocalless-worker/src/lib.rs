//! Batch pipeline orchestration.
//!
//! [`JobDispatcher`] registers submitted jobs and runs each one on its own
//! task through [`PipelineExecutor`]. The executor walks the inputs in
//! order, isolating per-item failures, and writes every state change
//! through the shared [`JobRegistry`](vocalless_jobs::JobRegistry).

pub mod cleanup;
pub mod collaborators;
pub mod collection;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod scenarios;

pub use cleanup::{CleanupOutcome, CleanupPolicy};
pub use collaborators::Collaborators;
pub use collection::{CollectionCoordinator, ResolvedCollection};
pub use config::WorkerConfig;
pub use dispatcher::JobDispatcher;
pub use error::{WorkerError, WorkerResult};
pub use executor::{PipelineExecutor, Stage};
pub use logging::JobLogger;
