//! One supervised FFmpeg invocation.
//!
//! A started job runs three tasks that share the job's status mutex:
//!
//! - a stdout reader and a stderr reader, each appending one line at a time
//!   and never holding the lock across a read
//! - a wait task that records the exit and serves kill requests from `stop`
//!
//! Both pipes are always drained, whether or not anyone follows progress, so
//! FFmpeg never blocks on a full pipe. Progress is published on a `watch`
//! channel: a single slot that is overwritten, never queued.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use wmark_media::{extract_seconds, render_command};
use wmark_models::{
    JobId, JobState, JobStatus, JobSummary, LogLine, StreamKind, CANCELLED_MESSAGE,
};

use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Lines longer than this are split.
const MAX_LINE_BYTES: usize = 64 * 1024;

type KillRequest = oneshot::Sender<std::io::Result<()>>;

/// Per-job tunables.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Maximum captured output lines kept
    pub max_log_lines: usize,
    /// How long `stop` waits for the kill to land
    pub stop_timeout: Duration,
    /// How long the wait task waits for readers after exit
    pub drain_timeout: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::from(&JobConfig::default())
    }
}

impl From<&JobConfig> for JobOptions {
    fn from(config: &JobConfig) -> Self {
        Self {
            max_log_lines: config.max_log_lines,
            stop_timeout: config.stop_timeout,
            drain_timeout: config.drain_timeout,
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The process was never launched; nothing to do
    NotStarted,
    /// The job had already reached a terminal state
    AlreadyFinished,
    /// The process was killed and the job marked failed
    Stopped,
}

enum Outcome {
    Exited { exit: ExitStatus, elapsed: Duration },
    WaitFailed(String),
    LaunchFailed(String),
    Cancelled,
}

/// State shared between the job handle and its tasks.
struct JobShared {
    status: Mutex<JobStatus>,
    progress_tx: watch::Sender<u64>,
    done_tx: watch::Sender<bool>,
    max_log_lines: usize,
    logger: JobLogger,
}

impl JobShared {
    async fn record_line(&self, stream: StreamKind, line: String) {
        self.logger.log_output(stream, &line);

        let seconds = match stream {
            StreamKind::Stderr => extract_seconds(&line),
            StreamKind::Stdout => None,
        };

        let mut status = self.status.lock().await;
        status.push_line(LogLine::new(stream, line), self.max_log_lines);
        if let Some(seconds) = seconds {
            let seconds = seconds as u64;
            if status.raise_progress(seconds) {
                self.progress_tx.send_replace(seconds);
            }
        }
    }

    /// Write the terminal state. Only the first caller wins.
    async fn finish(&self, outcome: Outcome) -> bool {
        let transitioned = {
            let mut status = self.status.lock().await;
            let transitioned = match &outcome {
                Outcome::Exited { exit, .. } if exit.success() => status.complete(),
                Outcome::Exited { exit, .. } => status.fail(exit.to_string()),
                Outcome::WaitFailed(message) | Outcome::LaunchFailed(message) => {
                    status.fail(message.clone())
                }
                Outcome::Cancelled => status.fail(CANCELLED_MESSAGE),
            };
            if transitioned {
                self.done_tx.send_replace(true);
            }
            transitioned
        };

        if transitioned {
            match outcome {
                Outcome::Exited { exit, elapsed } => {
                    if exit.success() {
                        metrics::record_job_completed(elapsed.as_secs_f64());
                    } else {
                        metrics::record_job_failed();
                    }
                    self.logger.log_exit(&exit, elapsed);
                }
                Outcome::WaitFailed(message) => {
                    metrics::record_job_failed();
                    self.logger.log_wait_failed(&message);
                }
                Outcome::LaunchFailed(message) => {
                    metrics::record_launch_failed();
                    self.logger.log_launch_failed(&message);
                }
                Outcome::Cancelled => {
                    metrics::record_job_cancelled();
                    self.logger.log_cancelled();
                }
            }
        }

        transitioned
    }
}

/// A managed FFmpeg process and its status record.
pub struct Job {
    id: JobId,
    program: PathBuf,
    args: Vec<String>,
    options: JobOptions,
    shared: Arc<JobShared>,
    started: AtomicBool,
    kill_tx: OnceLock<mpsc::Sender<KillRequest>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("program", &self.program)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Create a pending job. Nothing runs until [`Job::start`].
    pub fn new(
        id: JobId,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        options: JobOptions,
    ) -> Self {
        let (progress_tx, _) = watch::channel(0);
        let (done_tx, _) = watch::channel(false);
        let shared = JobShared {
            status: Mutex::new(JobStatus::new(id.clone())),
            progress_tx,
            done_tx,
            max_log_lines: options.max_log_lines,
            logger: JobLogger::new(&id),
        };

        Self {
            id,
            program: program.into(),
            args,
            options,
            shared: Arc::new(shared),
            started: AtomicBool::new(false),
            kill_tx: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The full command line, for diagnostics.
    pub fn command_line(&self) -> String {
        render_command(&self.program, &self.args)
    }

    /// Launch the process and its reader and wait tasks.
    ///
    /// A job can only be started once. If the process cannot be spawned the
    /// job moves straight to `failed` and the error is returned.
    pub async fn start(&self) -> JobResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(JobError::AlreadyStarted(self.id.clone()));
        }

        // Registered before spawning so a concurrent stop always reaches the
        // wait task once a process exists
        let (kill_tx, kill_rx) = mpsc::channel(1);
        let _ = self.kill_tx.set(kill_tx);

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return Err(self.launch_failed(e).await),
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.start_kill();
                let e = std::io::Error::other("failed to capture FFmpeg output pipes");
                return Err(self.launch_failed(e).await);
            }
        };

        self.shared.status.lock().await.mark_processing();
        metrics::record_job_started();
        self.shared.logger.log_launch(child.id(), &self.command_line());

        let span = self.shared.logger.span();
        let readers = vec![
            tokio::spawn(
                read_stream(Arc::clone(&self.shared), stdout, StreamKind::Stdout)
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                read_stream(Arc::clone(&self.shared), stderr, StreamKind::Stderr)
                    .instrument(span.clone()),
            ),
        ];
        tokio::spawn(
            supervise(
                Arc::clone(&self.shared),
                child,
                kill_rx,
                readers,
                self.options.drain_timeout,
            )
            .instrument(span),
        );

        Ok(())
    }

    async fn launch_failed(&self, e: std::io::Error) -> JobError {
        let message = format!("failed to start ffmpeg: {}", e);
        self.shared.finish(Outcome::LaunchFailed(message)).await;
        JobError::launch(&self.id, e)
    }

    /// Forcibly terminate the process.
    ///
    /// Not-started and already-finished jobs are left alone. Otherwise the
    /// process is killed and the job is marked failed with
    /// [`CANCELLED_MESSAGE`]. Waits at most the configured stop timeout and
    /// never waits for the output readers.
    pub async fn stop(&self) -> JobResult<StopOutcome> {
        if self.state().await.is_terminal() {
            return Ok(StopOutcome::AlreadyFinished);
        }

        // The status can still read pending just after spawn; the kill
        // channel is the authority on whether a process may exist
        let Some(kill_tx) = self.kill_tx.get() else {
            return Ok(StopOutcome::NotStarted);
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let request = async {
            // A closed channel means the wait task already recorded the exit
            if kill_tx.send(ack_tx).await.is_err() {
                return None;
            }
            ack_rx.await.ok()
        };

        match tokio::time::timeout(self.options.stop_timeout, request).await {
            Ok(Some(Ok(()))) => Ok(StopOutcome::Stopped),
            Ok(Some(Err(source))) => Err(JobError::Kill {
                job_id: self.id.clone(),
                source,
            }),
            Ok(None) => Ok(StopOutcome::AlreadyFinished),
            Err(_) => Err(JobError::StopTimeout {
                job_id: self.id.clone(),
                timeout_secs: self.options.stop_timeout.as_secs(),
            }),
        }
    }

    /// Point-in-time copy of the status record.
    pub async fn status(&self) -> JobStatus {
        self.shared.status.lock().await.clone()
    }

    /// Status record without the captured output.
    pub async fn summary(&self) -> JobSummary {
        self.shared.status.lock().await.summary()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> JobState {
        self.shared.status.lock().await.status
    }

    /// Receive progress updates in elapsed seconds.
    ///
    /// Only the latest value is kept; a slow receiver skips intermediate ones.
    pub fn subscribe_progress(&self) -> watch::Receiver<u64> {
        self.shared.progress_tx.subscribe()
    }

    /// Receiver that flips to `true` once, when the job reaches a terminal state.
    pub fn done_signal(&self) -> watch::Receiver<bool> {
        self.shared.done_tx.subscribe()
    }

    /// Whether the job reached a terminal state.
    pub fn is_done(&self) -> bool {
        *self.shared.done_tx.borrow()
    }

    /// Wait for the job to finish and return its final status.
    ///
    /// Never resolves for a job that is not started.
    pub async fn wait(&self) -> JobStatus {
        let mut done = self.done_signal();
        // The sender lives in `self.shared`, so the channel cannot close here
        let _ = done.wait_for(|done| *done).await;
        self.status().await
    }
}

/// Wait for the process to exit, or kill it on request.
async fn supervise(
    shared: Arc<JobShared>,
    mut child: Child,
    mut kill_rx: mpsc::Receiver<KillRequest>,
    readers: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
) {
    let started = Instant::now();

    loop {
        tokio::select! {
            result = child.wait() => {
                drain_readers(readers, drain_timeout).await;
                let outcome = match result {
                    Ok(exit) => Outcome::Exited { exit, elapsed: started.elapsed() },
                    Err(e) => Outcome::WaitFailed(format!("failed to wait for ffmpeg: {}", e)),
                };
                shared.finish(outcome).await;
                return;
            }
            Some(ack) = kill_rx.recv() => {
                match child.kill().await {
                    Ok(()) => {
                        shared.finish(Outcome::Cancelled).await;
                        let _ = ack.send(Ok(()));
                        return;
                    }
                    Err(e) => {
                        shared.logger.log_kill_failed(&e);
                        let _ = ack.send(Err(e));
                    }
                }
            }
        }
    }
}

/// Give the readers a bounded chance to flush the last lines.
async fn drain_readers(readers: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    for reader in readers {
        let _ = tokio::time::timeout_at(deadline, reader).await;
    }
}

/// Read one output stream to the end, recording every line.
///
/// Read errors end the stream the same way EOF does.
async fn read_stream<R>(shared: Arc<JobShared>, stream: R, kind: StreamKind)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut pending = Vec::new();

    while let Some(line) = next_line(&mut reader, &mut pending).await {
        shared.record_line(kind, line).await;
    }
}

/// Next non-empty line ended by `\n`, `\r` or end of stream.
///
/// FFmpeg redraws its stats line with `\r`, so carriage returns count as
/// line ends.
async fn next_line<R>(reader: &mut R, pending: &mut Vec<u8>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, complete) = {
            let available: &[u8] = match reader.fill_buf().await {
                Ok(buf) => buf,
                Err(_) => &[],
            };

            if available.is_empty() {
                if pending.is_empty() {
                    return None;
                }
                (0, true)
            } else {
                match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                    Some(pos) => {
                        pending.extend_from_slice(&available[..pos]);
                        (pos + 1, true)
                    }
                    None => {
                        pending.extend_from_slice(available);
                        (available.len(), pending.len() >= MAX_LINE_BYTES)
                    }
                }
            }
        };
        reader.consume(consumed);

        if complete && !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending[..]).into_owned();
            pending.clear();
            return Some(line);
        }
    }
}
