//! Job metrics.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "wmark_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "wmark_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "wmark_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "wmark_jobs_cancelled_total";
    pub const JOBS_LAUNCH_FAILED_TOTAL: &str = "wmark_jobs_launch_failed_total";
    pub const JOBS_ACTIVE: &str = "wmark_jobs_active";
    pub const JOBS_EVICTED_TOTAL: &str = "wmark_jobs_evicted_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "wmark_ffmpeg_duration_seconds";
    pub const PREVIEWS_TOTAL: &str = "wmark_previews_total";
    pub const PREVIEW_DURATION_SECONDS: &str = "wmark_preview_duration_seconds";
}

/// Record a process launched for a job.
pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).increment(1.0);
}

/// Record a process that could not be launched.
pub fn record_launch_failed() {
    counter!(names::JOBS_LAUNCH_FAILED_TOTAL).increment(1);
}

/// Record a job that ran to a successful exit.
pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}

/// Record a job whose process exited with an error.
pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

/// Record a job stopped on request.
pub fn record_job_cancelled() {
    counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

/// Record finished jobs removed from the registry.
pub fn record_jobs_evicted(count: usize) {
    counter!(names::JOBS_EVICTED_TOTAL).increment(count as u64);
}

/// Record a preview frame grab and whether it produced a frame.
pub fn record_preview(success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!(names::PREVIEWS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::PREVIEW_DURATION_SECONDS).record(duration_secs);
}
