//! Public entry point for watermark jobs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wmark_media::{build_frame_args, build_watermark_args, render_command, resolve_executable};
use wmark_models::{JobId, JobStatus, JobSummary, WatermarkRequest};

use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::job::{Job, JobOptions, StopOutcome};
use crate::metrics;
use crate::registry::JobRegistry;

/// Creates, queries and stops watermark jobs.
///
/// Cheap to clone; clones share one registry.
#[derive(Debug, Clone)]
pub struct JobSupervisor {
    config: Arc<JobConfig>,
    registry: Arc<JobRegistry>,
}

impl JobSupervisor {
    pub fn new(config: JobConfig) -> Self {
        Self::with_registry(config, Arc::new(JobRegistry::new()))
    }

    pub fn with_registry(config: JobConfig, registry: Arc<JobRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Executable and arguments for a request.
    pub fn build_command(&self, request: &WatermarkRequest) -> (PathBuf, Vec<String>) {
        let program = resolve_executable(&self.config.ffmpeg_path)
            .unwrap_or_else(|_| self.config.ffmpeg_path.clone());
        (program, build_watermark_args(request))
    }

    /// Human-readable command line for a request. Nothing is run.
    pub fn command_line(&self, request: &WatermarkRequest) -> String {
        let (program, args) = self.build_command(request);
        render_command(program, &args)
    }

    /// Create, register and start a job for `request`.
    ///
    /// A missing executable or output directory fails before any job exists.
    /// A launch failure leaves the job registered as failed and returns
    /// [`JobError::Launch`] carrying its id.
    pub async fn submit(&self, request: &WatermarkRequest) -> JobResult<JobId> {
        let program = resolve_executable(&self.config.ffmpeg_path)
            .map_err(|e| JobError::config(e.to_string()))?;

        if let Some(parent) = Path::new(&request.output_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(JobError::config(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let args = build_watermark_args(request);
        let job = Job::new(
            JobId::new(),
            program,
            args,
            JobOptions::from(self.config.as_ref()),
        );
        let job = self.registry.create(job).await?;

        info!(
            job_id = %job.id(),
            source = %request.source_path,
            output = %request.output_path,
            position = %request.position,
            "Submitting watermark job"
        );

        job.start().await?;
        Ok(job.id().clone())
    }

    /// Write the frame at `seconds` of `source` to `output` as an image.
    ///
    /// A one-shot FFmpeg run outside the registry, bounded by the configured
    /// preview timeout.
    pub async fn capture_frame(&self, source: &Path, seconds: f64, output: &Path) -> JobResult<()> {
        let program = resolve_executable(&self.config.ffmpeg_path)
            .map_err(|e| JobError::config(e.to_string()))?;
        let args = build_frame_args(source, seconds, output);
        debug!(command = %render_command(&program, &args), "Capturing preview frame");

        let started = Instant::now();
        let result = self.run_frame_grab(&program, &args).await;
        metrics::record_preview(result.is_ok(), started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => info!(
                source = %source.display(),
                seconds,
                "Captured preview frame"
            ),
            Err(e) => warn!(source = %source.display(), error = %e, "Preview frame failed"),
        }
        result
    }

    async fn run_frame_grab(&self, program: &Path, args: &[String]) -> JobResult<()> {
        let run = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let timeout = self.config.preview_timeout;
        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| JobError::preview(format!("timed out after {}s", timeout.as_secs())))?
            .map_err(|e| JobError::preview(format!("failed to start ffmpeg: {}", e)))?;

        if output.status.success() {
            return Ok(());
        }

        // FFmpeg puts the reason on its last stderr line
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .map(str::trim)
            .rev()
            .find(|l| !l.is_empty())
            .unwrap_or("no output");
        Err(JobError::preview(format!("ffmpeg {}: {}", output.status, reason)))
    }

    async fn job(&self, id: &JobId) -> JobResult<Arc<Job>> {
        self.registry
            .lookup(id)
            .await
            .ok_or_else(|| JobError::not_found(id))
    }

    /// Snapshot of a job's status.
    pub async fn status(&self, id: &JobId) -> JobResult<JobStatus> {
        Ok(self.job(id).await?.status().await)
    }

    /// Stop a job. See [`Job::stop`].
    pub async fn stop(&self, id: &JobId) -> JobResult<StopOutcome> {
        let job = self.job(id).await?;
        let outcome = job.stop().await?;
        info!(job_id = %id, outcome = ?outcome, "Stop requested");
        Ok(outcome)
    }

    /// Follow a job's progress in elapsed seconds.
    pub async fn subscribe_progress(&self, id: &JobId) -> JobResult<watch::Receiver<u64>> {
        Ok(self.job(id).await?.subscribe_progress())
    }

    /// Receiver that flips to `true` when the job finishes.
    pub async fn done_signal(&self, id: &JobId) -> JobResult<watch::Receiver<bool>> {
        Ok(self.job(id).await?.done_signal())
    }

    /// Wait for a job to finish and return its final status.
    pub async fn wait(&self, id: &JobId) -> JobResult<JobStatus> {
        Ok(self.job(id).await?.wait().await)
    }

    /// Summaries of all known jobs, newest first.
    pub async fn list(&self) -> Vec<JobSummary> {
        self.registry.summaries().await
    }

    /// Remove finished jobs older than `older_than`.
    pub async fn evict_finished(&self, older_than: Duration) -> usize {
        let removed = self.registry.evict_finished(older_than).await;
        if removed > 0 {
            metrics::record_jobs_evicted(removed);
            info!(removed, "Evicted finished jobs");
        }
        removed
    }

    /// Start the background eviction sweeper when a retention is configured.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let Some(retention) = self.config.retention else {
            return None;
        };
        if self.config.sweep_interval.is_zero() {
            warn!("Sweep interval is zero, eviction sweeper disabled");
            return None;
        }

        let supervisor = self.clone();
        let period = self.config.sweep_interval;
        info!(
            retention_secs = retention.as_secs(),
            interval_secs = period.as_secs(),
            "Starting job eviction sweeper"
        );

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                supervisor.evict_finished(retention).await;
            }
        }))
    }
}
