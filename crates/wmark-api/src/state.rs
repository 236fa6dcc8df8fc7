//! Application state.

use wmark_jobs::{JobConfig, JobSupervisor};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub supervisor: JobSupervisor,
}

impl AppState {
    /// Create new application state with a fresh job registry.
    pub fn new(config: ApiConfig, job_config: JobConfig) -> Self {
        Self {
            config,
            supervisor: JobSupervisor::new(job_config),
        }
    }
}
