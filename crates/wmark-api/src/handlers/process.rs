//! Watermark job handlers.
//!
//! Provides REST API endpoints for:
//! - Submitting a watermark job and previewing its command line
//! - Polling, listing and stopping jobs
//! - Following a job's progress as server-sent events

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;
use validator::Validate;

use wmark_jobs::{JobSupervisor, StopOutcome};
use wmark_models::{JobId, JobState, JobStatus, JobSummary, WatermarkRequest};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::response::ApiResponse;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// Response for a stop request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub id: JobId,
    pub outcome: StopOutcome,
    pub status: JobState,
}

/// Command line preview.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandPreview {
    /// Shell-ready command line
    pub command: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Progress event payload.
#[derive(Debug, Serialize)]
struct ProgressPayload {
    /// Elapsed media time in seconds
    progress: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Validate and start a watermark job.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<WatermarkRequest>,
) -> ApiResult<Json<ApiResponse<JobId>>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let job_id = state.supervisor.submit(&request).await?;
    info!(job_id = %job_id, "Watermark job started");

    Ok(Json(ApiResponse::with_message(
        "Task started successfully",
        job_id,
    )))
}

/// Summaries of all known jobs.
pub async fn list_jobs(State(state): State<AppState>) -> Json<ApiResponse<Vec<JobSummary>>> {
    Json(ApiResponse::success(state.supervisor.list().await))
}

/// Full status of one job, including captured output.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ApiResponse<JobStatus>>> {
    let job_id = JobId::from_string(job_id);
    let status = state.supervisor.status(&job_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

/// Stop a job.
pub async fn stop_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ApiResponse<StopResponse>>> {
    let job_id = JobId::from_string(job_id);
    let outcome = state.supervisor.stop(&job_id).await?;
    let status = state.supervisor.status(&job_id).await?.status;

    let message = match outcome {
        StopOutcome::Stopped => "Task stopped",
        StopOutcome::NotStarted => "Task not started",
        StopOutcome::AlreadyFinished => "Task already finished",
    };

    Ok(Json(ApiResponse::with_message(
        message,
        StopResponse {
            id: job_id,
            outcome,
            status,
        },
    )))
}

/// Render the FFmpeg command line for a request without running it.
pub async fn generate_command(
    State(state): State<AppState>,
    Json(request): Json<WatermarkRequest>,
) -> Json<ApiResponse<CommandPreview>> {
    let (program, args) = state.supervisor.build_command(&request);
    let command = state.supervisor.command_line(&request);

    Json(ApiResponse::success(CommandPreview {
        command,
        program,
        args,
    }))
}

/// Stream a job's progress as server-sent events.
///
/// Sends the current progress on connect, a `progress` event per update and
/// a final `done` event carrying the job summary.
pub async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let job_id = JobId::from_string(job_id);
    let mut progress = state.supervisor.subscribe_progress(&job_id).await?;
    let done = state.supervisor.done_signal(&job_id).await?;
    progress.mark_changed();

    let feed = ProgressFeed {
        supervisor: state.supervisor.clone(),
        job_id,
        progress,
        done,
        _guard: StreamGuard::open(),
    };

    Ok(Sse::new(progress_events(feed)).keep_alive(KeepAlive::default()))
}

// ============================================================================
// Progress stream
// ============================================================================

struct ProgressFeed {
    supervisor: JobSupervisor,
    job_id: JobId,
    progress: watch::Receiver<u64>,
    done: watch::Receiver<bool>,
    _guard: StreamGuard,
}

/// Tracks open streams in the active gauge.
struct StreamGuard;

impl StreamGuard {
    fn open() -> Self {
        metrics::record_sse_opened();
        Self
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::record_sse_closed();
    }
}

fn progress_events(feed: ProgressFeed) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(Some(feed), |feed| async move {
        let mut feed = feed?;

        let finished = {
            let ProgressFeed { progress, done, .. } = &mut feed;
            tokio::select! {
                biased;
                changed = progress.changed() => changed.is_err(),
                _ = async { let _ = done.wait_for(|done| *done).await; } => true,
            }
        };

        if !finished {
            let progress = *feed.progress.borrow_and_update();
            let event = Event::default()
                .event("progress")
                .json_data(ProgressPayload { progress });
            return Some((event, Some(feed)));
        }

        let event = match feed.supervisor.status(&feed.job_id).await {
            Ok(status) => Event::default().event("done").json_data(status.summary()),
            Err(e) => Ok(Event::default().event("error").data(e.to_string())),
        };
        Some((event, None))
    })
}
