//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops until a
//! recorder (the API's Prometheus exporter) is installed.

use metrics::{counter, histogram};
use vocalless_models::ItemOutcome;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "vocalless_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vocalless_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vocalless_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "vocalless_jobs_cancelled_total";
    pub const ITEMS_PROCESSED_TOTAL: &str = "vocalless_items_processed_total";
    pub const STAGE_DURATION_SECONDS: &str = "vocalless_stage_duration_seconds";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

pub fn record_job_cancelled() {
    counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
}

pub fn record_item_processed(outcome: ItemOutcome) {
    let labels = [("outcome", outcome.as_str().to_string())];
    counter!(names::ITEMS_PROCESSED_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
