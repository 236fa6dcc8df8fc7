//! Shared data models for the watermark job engine.
//!
//! This crate provides Serde-serializable types for:
//! - Watermark requests and overlay positions
//! - Job identifiers and lifecycle states
//! - Point-in-time job status records with captured transcoder output

pub mod job;
pub mod job_status;
pub mod request;

// Re-export common types
pub use job::{JobId, JobState};
pub use job_status::{JobStatus, JobSummary, LogLine, StreamKind, CANCELLED_MESSAGE};
pub use request::{Position, WatermarkRequest};
