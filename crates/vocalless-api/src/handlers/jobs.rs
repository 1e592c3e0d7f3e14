//! Batch job handlers.
//!
//! Submission returns immediately; clients poll `GET /jobs/:job_id` for
//! progress and per-item results.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vocalless_models::{
    normalize_source_url, Job, JobId, JobOptions, JobStatus, JobSummary, Privacy,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

/// Request body for `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub video_urls: Vec<String>,
    /// Expanded into its member URLs, appended after `video_urls`
    #[serde(default)]
    pub playlist_url: Option<String>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default = "default_true")]
    pub persist_locally: bool,
    #[serde(default)]
    pub create_collection: bool,
    #[serde(default)]
    pub add_to_collection: bool,
    #[serde(default)]
    pub collection_name: Option<String>,
    /// Existing collection to feed instead of creating one
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub privacy: Option<Privacy>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub status: JobStatus,
}

/// Trim, drop blanks and normalize.
fn clean_urls(urls: &[String]) -> impl Iterator<Item = String> + '_ {
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(normalize_source_url)
}

/// POST /jobs
///
/// Returns:
/// - 200: `{job_id, message}`; processing continues in the background
/// - 400: no usable URLs, or the playlist could not be expanded
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<Json<SubmitJobResponse>> {
    let mut urls: Vec<String> = clean_urls(&request.video_urls).collect();

    if let Some(playlist) = request
        .playlist_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        let members = state
            .expander
            .expand(playlist)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to expand playlist: {}", e)))?;
        info!(playlist = %playlist, count = members.len(), "Expanded playlist");
        urls.extend(clean_urls(&members));
    }

    if urls.is_empty() {
        return Err(ApiError::bad_request("No URLs provided"));
    }

    let options = JobOptions {
        publish: request.publish,
        persist_locally: request.persist_locally,
        create_collection: request.create_collection,
        add_to_collection: request.add_to_collection,
        collection_name: request.collection_name.unwrap_or_default().trim().to_string(),
        existing_collection_id: request.collection_id,
        privacy: request
            .privacy
            .unwrap_or_else(|| state.dispatcher.default_privacy()),
    };

    let total = urls.len();
    let job_id = state.dispatcher.submit(Job::new(urls, options)).await?;
    metrics::record_job_submitted(total);
    info!(job_id = %job_id, total_items = total, "Accepted batch");

    Ok(Json(SubmitJobResponse {
        job_id,
        message: "Processing started".to_string(),
    }))
}

/// GET /jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.registry.get(&JobId::from_string(job_id)).await?;
    Ok(Json(job))
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobSummary>> {
    Json(state.registry.list().await)
}

/// POST /jobs/:job_id/cancel
///
/// Cancelling a finished job is a no-op that reports its final status.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelJobResponse>> {
    let status = state.registry.cancel(&JobId::from_string(job_id)).await?;
    Ok(Json(CancelJobResponse { status }))
}
