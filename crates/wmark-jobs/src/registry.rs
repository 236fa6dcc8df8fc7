//! Concurrency-safe job registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use wmark_models::{JobId, JobSummary};

use crate::error::{JobError, JobResult};
use crate::job::Job;

/// Mapping from job id to job handle.
///
/// Only the map is locked here. Each job guards its own status, and the
/// registry lock is never held while a job lock is taken.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Fails if its id is already taken.
    pub async fn create(&self, job: Job) -> JobResult<Arc<Job>> {
        let job = Arc::new(job);
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job.id()) {
            return Err(JobError::DuplicateJob(job.id().clone()));
        }
        jobs.insert(job.id().clone(), Arc::clone(&job));
        Ok(job)
    }

    /// Look up a job by id.
    pub async fn lookup(&self, id: &JobId) -> Option<Arc<Job>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Number of registered jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Handles to every registered job.
    pub async fn snapshot(&self) -> Vec<Arc<Job>> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Summaries of every job, newest first.
    pub async fn summaries(&self) -> Vec<JobSummary> {
        let jobs = self.snapshot().await;
        let mut summaries = Vec::with_capacity(jobs.len());
        for job in jobs {
            summaries.push(job.summary().await);
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Remove finished jobs last updated more than `older_than` ago.
    ///
    /// Returns the number of jobs removed. Running and pending jobs are
    /// never evicted.
    pub async fn evict_finished(&self, older_than: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            return 0;
        };

        let mut expired = Vec::new();
        for job in self.snapshot().await {
            let summary = job.summary().await;
            if summary.status.is_terminal() && summary.updated_at <= cutoff {
                expired.push(summary.id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write().await;
        let removed = expired
            .iter()
            .filter(|id| jobs.remove(*id).is_some())
            .count();
        debug!(removed, remaining = jobs.len(), "Evicted finished jobs");
        removed
    }
}
