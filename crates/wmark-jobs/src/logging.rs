//! Structured logging for a job's process lifecycle.
//!
//! Every event carries the job id; exits carry the code or the signal that
//! ended FFmpeg.

use std::process::ExitStatus;
use std::time::Duration;

use tracing::{debug, error, info, warn, Span};

use wmark_models::{JobId, StreamKind, CANCELLED_MESSAGE};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    /// Log a launched process and the command line it runs.
    pub fn log_launch(&self, pid: Option<u32>, command_line: &str) {
        info!(
            job_id = %self.job_id,
            pid = ?pid,
            "FFmpeg launched: {}", command_line
        );
    }

    /// Log a process that could not be launched.
    pub fn log_launch_failed(&self, message: &str) {
        error!(job_id = %self.job_id, "FFmpeg launch failed: {}", message);
    }

    /// Log one line of transcoder output.
    pub fn log_output(&self, stream: StreamKind, line: &str) {
        debug!(
            job_id = %self.job_id,
            stream = %stream,
            "[FFmpeg {}] {}", stream, line
        );
    }

    /// Log how the process exited.
    pub fn log_exit(&self, exit: &ExitStatus, elapsed: Duration) {
        let elapsed_secs = elapsed.as_secs_f64();
        if exit.success() {
            info!(
                job_id = %self.job_id,
                exit_code = 0,
                elapsed_secs,
                "FFmpeg finished in {:.1}s", elapsed_secs
            );
            return;
        }

        match exit.code() {
            Some(code) => error!(
                job_id = %self.job_id,
                exit_code = code,
                elapsed_secs,
                "FFmpeg exited with code {}", code
            ),
            None => error!(
                job_id = %self.job_id,
                signal = ?exit_signal(exit),
                elapsed_secs,
                "FFmpeg terminated by signal: {}", exit
            ),
        }
    }

    /// Log a failure to collect the exit status.
    pub fn log_wait_failed(&self, message: &str) {
        error!(job_id = %self.job_id, "Lost track of FFmpeg: {}", message);
    }

    /// Log a process killed on request.
    pub fn log_cancelled(&self) {
        info!(job_id = %self.job_id, "Job stopped: {}", CANCELLED_MESSAGE);
    }

    /// Log a kill that did not land.
    pub fn log_kill_failed(&self, e: &std::io::Error) {
        warn!(job_id = %self.job_id, error = %e, "Failed to kill FFmpeg");
    }

    /// Get the job ID.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span the job's reader and wait tasks run in.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id)
    }
}

#[cfg(unix)]
fn exit_signal(exit: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    exit.signal()
}

#[cfg(not(unix))]
fn exit_signal(_exit: &ExitStatus) -> Option<i32> {
    None
}
