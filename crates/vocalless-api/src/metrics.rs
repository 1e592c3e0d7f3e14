//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;
use std::sync::LazyLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vocalless_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vocalless_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vocalless_http_requests_in_flight";

    // Submission metrics
    pub const JOBS_SUBMITTED_TOTAL: &str = "vocalless_jobs_submitted_total";
    pub const JOB_ITEMS_SUBMITTED: &str = "vocalless_job_items_submitted";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vocalless_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted batch.
pub fn record_job_submitted(items: usize) {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
    histogram!(names::JOB_ITEMS_SUBMITTED).record(items as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Path patterns collapsed to placeholders, applied in order.
static PATH_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"/jobs/[^/]+", "/jobs/:job_id"),
        (r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}", ":id"),
        (r"/[0-9]+(/|$)", "/:id$1"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        Regex::new(pattern).ok().map(|re| (re, replacement))
    })
    .collect()
});

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    PATH_PATTERNS
        .iter()
        .fold(path.to_string(), |path, (re, replacement)| {
            re.replace_all(&path, *replacement).into_owned()
        })
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
