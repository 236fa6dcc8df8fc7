//! Job status record for polling.
//!
//! A `JobStatus` is the only part of a job visible to external readers.
//! Callers always receive a cloned snapshot, never a live reference.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobState};

/// Error message recorded when a job is stopped on request.
pub const CANCELLED_MESSAGE: &str = "Task stopped by user";

/// Output stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of transcoder output, tagged by source stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: StreamKind,
    pub line: String,
}

impl LogLine {
    pub fn new(stream: StreamKind, line: impl Into<String>) -> Self {
        Self {
            stream,
            line: line.into(),
        }
    }
}

/// Status record of a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Unique job identifier
    pub id: JobId,
    /// Current lifecycle state
    pub status: JobState,
    /// Elapsed media time processed, in seconds
    pub progress: u64,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Captured output, oldest first
    pub output: VecDeque<LogLine>,
    /// Lines discarded because the output log was full
    pub dropped_lines: u64,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the record was last touched
    pub updated_at: DateTime<Utc>,
}

/// Status record without the captured output, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobState,
    pub progress: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Create a new pending status record.
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobState::Pending,
            progress: 0,
            error: None,
            output: VecDeque::new(),
            dropped_lines: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy everything except the captured output.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the job as running. Returns false if it was not pending.
    pub fn mark_processing(&mut self) -> bool {
        self.advance(JobState::Processing, None)
    }

    /// Mark the job as completed. Returns false if it was already terminal.
    pub fn complete(&mut self) -> bool {
        self.advance(JobState::Completed, None)
    }

    /// Mark the job as failed. Returns false if it was already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        self.advance(JobState::Failed, Some(error.into()))
    }

    /// Whether the job ended because it was stopped on request.
    pub fn was_cancelled(&self) -> bool {
        self.status == JobState::Failed && self.error.as_deref() == Some(CANCELLED_MESSAGE)
    }

    fn advance(&mut self, next: JobState, error: Option<String>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        if error.is_some() {
            self.error = error;
        }
        self.updated_at = Utc::now();
        true
    }

    /// Append a captured line, evicting the oldest when `capacity` is reached.
    pub fn push_line(&mut self, line: LogLine, capacity: usize) {
        if capacity == 0 {
            self.dropped_lines += 1;
        } else {
            while self.output.len() >= capacity {
                self.output.pop_front();
                self.dropped_lines += 1;
            }
            self.output.push_back(line);
        }
        self.updated_at = Utc::now();
    }

    /// Raise progress to `seconds`. Out-of-order values are ignored.
    ///
    /// Returns true when the stored value changed.
    pub fn raise_progress(&mut self, seconds: u64) -> bool {
        if seconds <= self.progress {
            return false;
        }
        self.progress = seconds;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_is_pending() {
        let status = JobStatus::new(JobId::from_string("job-1"));
        assert_eq!(status.status, JobState::Pending);
        assert_eq!(status.progress, 0);
        assert!(status.error.is_none());
        assert!(status.output.is_empty());
        assert_eq!(status.created_at, status.updated_at);
    }

    #[test]
    fn test_status_transitions() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));

        assert!(status.mark_processing());
        assert_eq!(status.status, JobState::Processing);
        assert!(!status.is_terminal());

        assert!(status.complete());
        assert!(status.is_terminal());

        // First terminal write wins
        assert!(!status.fail("late failure"));
        assert_eq!(status.status, JobState::Completed);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_launch_failure_skips_processing() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));
        assert!(status.fail("No such file or directory"));
        assert_eq!(status.status, JobState::Failed);
        assert!(!status.mark_processing());
    }

    #[test]
    fn test_cancelled_detection() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));
        status.mark_processing();
        status.fail(CANCELLED_MESSAGE);
        assert!(status.was_cancelled());
    }

    #[test]
    fn test_output_is_capped() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));
        for i in 0..5 {
            status.push_line(LogLine::new(StreamKind::Stderr, format!("line {}", i)), 3);
        }
        assert_eq!(status.output.len(), 3);
        assert_eq!(status.dropped_lines, 2);
        assert_eq!(status.output.front().unwrap().line, "line 2");
        assert_eq!(status.output.back().unwrap().line, "line 4");
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));
        assert!(status.raise_progress(10));
        assert!(!status.raise_progress(7));
        assert_eq!(status.progress, 10);
        assert!(status.raise_progress(12));
        assert_eq!(status.progress, 12);
    }

    #[test]
    fn test_summary_omits_output() {
        let mut status = JobStatus::new(JobId::from_string("job-1"));
        status.push_line(LogLine::new(StreamKind::Stdout, "hello"), 10);
        status.raise_progress(4);
        let summary = status.summary();
        assert_eq!(summary.progress, 4);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("output").is_none());
    }

    #[test]
    fn test_camel_case_serialization() {
        let status = JobStatus::new(JobId::from_string("job-1"));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("droppedLines").is_some());
        assert!(json.get("error").is_none());
    }
}
