//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    generate_command, get_file, get_job_status, health, job_events, list_files, list_jobs,
    preview_media, save_watermark, stop_job, submit_job, upload_file,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let process_routes = Router::new()
        .route("/process", post(submit_job).get(list_jobs))
        .route("/process/:job_id", get(get_job_status))
        .route("/process/:job_id/stop", post(stop_job))
        .route("/process/:job_id/events", get(job_events))
        .route("/generate-command", post(generate_command));

    let file_routes = Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/*path", get(get_file))
        .route("/preview", get(preview_media))
        .route("/watermark", post(save_watermark));

    let api_routes = Router::new().merge(process_routes).merge(file_routes);

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
