//! Axum HTTP API server for watermark jobs.
//!
//! This crate provides:
//! - Job submission, polling, listing and cancellation
//! - Progress streaming over server-sent events
//! - Directory listing, uploads, file access and media previews
//! - Watermark image storage
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
