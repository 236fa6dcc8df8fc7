//! Watermark job orchestration.
//!
//! This crate provides:
//! - `Job`: one supervised FFmpeg process with concurrent stdout/stderr draining
//! - `JobRegistry`: concurrency-safe job lookup by id
//! - `JobSupervisor`: create, query, stop and follow jobs
//! - Structured job logging and job metrics

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod supervisor;

pub use config::JobConfig;
pub use error::{JobError, JobResult};
pub use job::{Job, JobOptions, StopOutcome};
pub use logging::JobLogger;
pub use registry::JobRegistry;
pub use supervisor::JobSupervisor;
