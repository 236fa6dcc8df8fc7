//! FFmpeg command building and output parsing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Overlay filter expressions for watermark placement
//! - Progress extraction from FFmpeg's diagnostic output
//! - Executable resolution for the configured transcoder
//! - Frame-grab arguments for video previews

pub mod command;
pub mod error;
pub mod preview;
pub mod progress;
pub mod watermark;

pub use command::{render_command, resolve_executable, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use preview::{build_frame_args, parse_timepoint, MediaKind, DEFAULT_TIMEPOINT};
pub use progress::{extract_seconds, parse_timestamp};
pub use watermark::{build_overlay_filter, build_watermark_args, position_expression};
