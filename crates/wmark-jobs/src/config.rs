//! Job engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Job engine configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// FFmpeg executable, a bare name is looked up in PATH
    pub ffmpeg_path: PathBuf,
    /// Maximum captured output lines kept per job
    pub max_log_lines: usize,
    /// How long `stop` waits for the process to be killed
    pub stop_timeout: Duration,
    /// How long to wait for output readers after the process exits
    pub drain_timeout: Duration,
    /// Finished jobs older than this are evicted; `None` keeps them forever
    pub retention: Option<Duration>,
    /// How often the eviction sweeper runs
    pub sweep_interval: Duration,
    /// Upper bound on a single preview frame grab
    pub preview_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            max_log_lines: 1000,
            stop_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(2),
            retention: None,
            sweep_interval: Duration::from_secs(60),
            preview_timeout: Duration::from_secs(30),
        }
    }
}

impl JobConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            max_log_lines: std::env::var("JOB_MAX_LOG_LINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_log_lines),
            stop_timeout: std::env::var("JOB_STOP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.stop_timeout),
            drain_timeout: std::env::var("JOB_DRAIN_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.drain_timeout),
            retention: std::env::var("JOB_RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            sweep_interval: std::env::var("JOB_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            preview_timeout: std::env::var("PREVIEW_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.preview_timeout),
        }
    }

    /// Use a specific FFmpeg executable.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Keep finished jobs for `retention` before evicting them.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.max_log_lines, 1000);
        assert_eq!(config.stop_timeout, Duration::from_secs(10));
        assert!(config.retention.is_none());
        assert_eq!(config.preview_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let config = JobConfig::default()
            .with_ffmpeg_path("/opt/ffmpeg/bin/ffmpeg")
            .with_retention(Duration::from_secs(3600));
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.retention, Some(Duration::from_secs(3600)));
    }
}
