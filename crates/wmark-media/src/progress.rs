//! Progress extraction from FFmpeg's diagnostic output.
//!
//! FFmpeg periodically prints a stats line such as
//! `frame=  120 fps= 30 q=28.0 size= 256kB time=00:00:04.00 bitrate= 524.3kbits/s speed=1.01x`.
//! The `time=` field is the amount of media processed so far. Total duration
//! is not probed, so this is elapsed media time, not a percentage.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MediaError, MediaResult};

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=\s*([0-9:.]+)").unwrap());

/// Extract elapsed seconds from a line of FFmpeg output.
///
/// Returns `None` when the line carries no `time=HH:MM:SS(.fraction)` field
/// or the value does not have three components.
pub fn extract_seconds(line: &str) -> Option<f64> {
    let captures = TIME_PATTERN.captures(line)?;
    parse_timestamp(captures.get(1)?.as_str()).ok()
}

/// Parse an `HH:MM:SS(.fraction)` timestamp into seconds.
///
/// Components that are not numbers count as zero.
pub fn parse_timestamp(value: &str) -> MediaResult<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return Err(MediaError::InvalidTimestamp(value.to_string()));
    }

    let component = |s: &str| s.parse::<f64>().unwrap_or(0.0);
    let hours = component(parts[0]);
    let minutes = component(parts[1]);
    let seconds = component(parts[2]);

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_stats_line() {
        let line = "frame=  120 fps= 30 q=28.0 size=     256kB time=00:01:05.00 bitrate= 524.3kbits/s speed=1.01x";
        assert_eq!(extract_seconds(line), Some(65.0));
    }

    #[test]
    fn test_extract_without_fraction() {
        assert_eq!(extract_seconds("time=01:00:00"), Some(3600.0));
    }

    #[test]
    fn test_extract_keeps_fraction() {
        let secs = extract_seconds("time=00:00:02.50 bitrate=N/A").unwrap();
        assert!((secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_timestamp() {
        assert_eq!(extract_seconds("no timestamp here"), None);
        assert_eq!(extract_seconds("time=N/A bitrate=N/A"), None);
    }

    #[test]
    fn test_wrong_component_count() {
        assert_eq!(extract_seconds("time=00:05"), None);
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(MediaError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_non_numeric_component_degrades_to_zero() {
        // "1.2.3" is not a valid float, the other fields still count
        assert_eq!(parse_timestamp("00:01:1.2.3").unwrap(), 60.0);
        assert_eq!(extract_seconds("time=.:02:03"), Some(123.0));
    }
}
