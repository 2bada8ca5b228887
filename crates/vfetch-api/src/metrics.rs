//! Prometheus metrics for the API server.

use std::collections::HashMap;
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use vfetch_models::TaskStatus;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vfetch_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vfetch_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vfetch_http_requests_in_flight";

    // Task metrics
    pub const TASKS_SUBMITTED_TOTAL: &str = "vfetch_tasks_submitted_total";
    pub const TASKS: &str = "vfetch_tasks";
    pub const TASKS_IN_FLIGHT: &str = "vfetch_tasks_in_flight";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "vfetch_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_task_submitted(resolution: &'static str) {
    counter!(names::TASKS_SUBMITTED_TOTAL, "resolution" => resolution).increment(1);
}

/// Publish the current number of tasks per status, zero included.
pub fn set_task_counts(counts: &HashMap<TaskStatus, usize>, in_flight: usize) {
    for status in TaskStatus::ALL {
        let n = counts.get(&status).copied().unwrap_or(0);
        gauge!(names::TASKS, "status" => status.as_str()).set(n as f64);
    }
    gauge!(names::TASKS_IN_FLIGHT).set(in_flight as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Label for a request path. Matched routes use their template so task ids
/// don't explode label cardinality.
fn path_label(request: &Request<Body>) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => "unmatched".to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = path_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
