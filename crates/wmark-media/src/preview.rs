//! Still previews for the file picker.
//!
//! Images are shown as they are; videos get one frame grabbed at a seek
//! position:
//!
//! ```text
//! -ss <seconds> -i <source> -vframes 1 -y <frame.jpg>
//! ```

use std::path::Path;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::progress::parse_timestamp;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv"];

/// Seek position used when none is given.
pub const DEFAULT_TIMEPOINT: &str = "1";

/// How a file can be previewed, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a path. `None` for anything that cannot be previewed.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// Parse a seek position given as plain seconds or `HH:MM:SS(.fraction)`.
pub fn parse_timepoint(value: &str) -> MediaResult<f64> {
    let value = value.trim();
    let seconds = if value.contains(':') {
        parse_timestamp(value)?
    } else {
        value
            .parse::<f64>()
            .map_err(|_| MediaError::InvalidTimestamp(value.to_string()))?
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(MediaError::InvalidTimestamp(value.to_string()));
    }
    Ok(seconds)
}

/// Arguments that write the frame at `seconds` of `source` to `output`.
pub fn build_frame_args(
    source: impl AsRef<Path>,
    seconds: f64,
    output: impl AsRef<Path>,
) -> Vec<String> {
    FfmpegCommand::new(output)
        .seek(format!("{:.3}", seconds))
        .input(source)
        .video_frames(1)
        .build_args()
}
