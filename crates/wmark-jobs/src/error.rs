//! Job error types.

use thiserror::Error;

use wmark_models::JobId;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start job {job_id}: {source}")]
    Launch {
        job_id: JobId,
        source: std::io::Error,
    },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already started: {0}")]
    AlreadyStarted(JobId),

    #[error("Duplicate job id: {0}")]
    DuplicateJob(JobId),

    #[error("Failed to kill process for job {job_id}: {source}")]
    Kill {
        job_id: JobId,
        source: std::io::Error,
    },

    #[error("Timed out after {timeout_secs}s stopping job {job_id}")]
    StopTimeout { job_id: JobId, timeout_secs: u64 },

    #[error("Preview failed: {0}")]
    Preview(String),
}

impl JobError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn launch(job_id: &JobId, source: std::io::Error) -> Self {
        Self::Launch {
            job_id: job_id.clone(),
            source,
        }
    }

    pub fn preview(msg: impl Into<String>) -> Self {
        Self::Preview(msg.into())
    }

    pub fn not_found(job_id: &JobId) -> Self {
        Self::NotFound(job_id.clone())
    }

    /// The job this error concerns, if one was created.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobError::Launch { job_id, .. }
            | JobError::NotFound(job_id)
            | JobError::AlreadyStarted(job_id)
            | JobError::DuplicateJob(job_id)
            | JobError::Kill { job_id, .. }
            | JobError::StopTimeout { job_id, .. } => Some(job_id),
            JobError::Config(_) | JobError::Preview(_) => None,
        }
    }
}
