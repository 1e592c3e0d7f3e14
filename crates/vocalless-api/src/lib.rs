//! Axum HTTP API for the Vocalless batch pipeline.
//!
//! Clients submit a batch of source URLs, poll the job for progress and
//! per-item results, and manage the publishing account's collections.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
