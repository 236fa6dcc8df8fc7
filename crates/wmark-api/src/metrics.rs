//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "wmark_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "wmark_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "wmark_http_requests_in_flight";

    // Progress streams
    pub const SSE_STREAMS_ACTIVE: &str = "wmark_sse_streams_active";

    // Watermark images and uploads
    pub const WATERMARKS_SAVED_TOTAL: &str = "wmark_watermarks_saved_total";
    pub const UPLOADS_TOTAL: &str = "wmark_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "wmark_upload_bytes_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static PROCESS_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/process/[^/]+").unwrap());

static FILE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/api/files/.+$").unwrap());

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

/// Record a progress stream opening.
pub fn record_sse_opened() {
    gauge!(names::SSE_STREAMS_ACTIVE).increment(1.0);
}

/// Record a progress stream closing.
pub fn record_sse_closed() {
    gauge!(names::SSE_STREAMS_ACTIVE).decrement(1.0);
}

/// Record a saved watermark image.
pub fn record_watermark_saved() {
    counter!(names::WATERMARKS_SAVED_TOTAL).increment(1);
}

/// Record a stored multipart upload.
pub fn record_upload(bytes: u64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

/// Sanitize path for metrics labels (remove job ids and served file paths).
fn sanitize_path(path: &str) -> String {
    if FILE_SEGMENT.is_match(path) {
        return "/api/files/*path".to_string();
    }
    let path = UUID_SEGMENT.replace_all(path, ":id");
    PROCESS_SEGMENT
        .replace(&path, "/api/process/:job_id")
        .into_owned()
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
