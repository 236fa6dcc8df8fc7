//! Watermark overlay arguments.
//!
//! Maps a [`WatermarkRequest`] to the FFmpeg invocation that composites the
//! watermark image onto the source media:
//!
//! ```text
//! -i <source> -i <watermark> -filter_complex <overlay> -codec:a copy -y <output>
//! ```
//!
//! Scale and opacity are rendered as given. Range checks are the caller's job.

use tracing::debug;

use wmark_models::{Position, WatermarkRequest};

use crate::command::FfmpegCommand;

/// Overlay coordinates for a watermark position.
pub fn position_expression(position: Position) -> &'static str {
    match position {
        Position::TopLeft => "x=0:y=0",
        Position::Center => "x=(main_w-overlay_w)/2:y=(main_h-overlay_h)/2",
        Position::TopRight => "x=main_w-overlay_w:y=0",
        Position::BottomLeft => "x=0:y=main_h-overlay_h",
        Position::BottomRight => "x=main_w-overlay_w:y=main_h-overlay_h",
    }
}

/// Build the filter complex that scales, fades and places the watermark.
///
/// Input 0 is the source, input 1 the watermark image. `scale2ref` sizes the
/// watermark to `scale`% of the source width and keeps its aspect ratio; its
/// alpha channel is then multiplied by `opacity / 100`.
pub fn build_overlay_filter(request: &WatermarkRequest) -> String {
    let position = position_expression(request.position);
    let alpha = f64::from(request.opacity) / 100.0;

    debug!(position = %request.position, expression = position, "Watermark position");

    format!(
        "[1][0]scale2ref=w=main_w*{}/100:h=ow/a[scaled][base];\
         [scaled]format=rgba,colorchannelmixer=aa={:.2}[watermark];\
         [base][watermark]overlay={}",
        request.scale, alpha, position
    )
}

/// Build the full FFmpeg argument list for a watermark request.
pub fn build_watermark_args(request: &WatermarkRequest) -> Vec<String> {
    let args = FfmpegCommand::new(&request.output_path)
        .input(&request.source_path)
        .input(&request.watermark_path)
        .filter_complex(build_overlay_filter(request))
        .audio_codec("copy")
        .build_args();

    debug!(args = ?args, "FFmpeg watermark arguments");

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(position: Position) -> WatermarkRequest {
        WatermarkRequest::new("in.mp4", "wm.png", "out.mp4")
            .with_position(position)
            .with_scale(50)
            .with_opacity(80)
    }

    #[test]
    fn test_argument_layout() {
        let args = build_watermark_args(&request(Position::Center));
        assert_eq!(args.len(), 10);
        assert_eq!(&args[0..4], &["-i", "in.mp4", "-i", "wm.png"]);
        assert_eq!(args[4], "-filter_complex");
        assert_eq!(&args[6..], &["-codec:a", "copy", "-y", "out.mp4"]);
    }

    #[test]
    fn test_center_overlay_expression() {
        let filter = build_overlay_filter(&request(Position::Center));
        assert_eq!(
            filter,
            "[1][0]scale2ref=w=main_w*50/100:h=ow/a[scaled][base];\
             [scaled]format=rgba,colorchannelmixer=aa=0.80[watermark];\
             [base][watermark]overlay=x=(main_w-overlay_w)/2:y=(main_h-overlay_h)/2"
        );
    }

    #[test]
    fn test_scale_is_relative_to_source_width() {
        let filter = build_overlay_filter(&request(Position::TopLeft));
        // Input 0 (the source) is the reference the width is measured against
        assert!(filter.starts_with("[1][0]scale2ref=w=main_w*50/100:h=ow/a"));
        assert!(!filter.contains("iw*"));
    }

    #[test]
    fn test_every_position_is_deterministic() {
        for position in [
            Position::TopLeft,
            Position::Center,
            Position::TopRight,
            Position::BottomLeft,
            Position::BottomRight,
        ] {
            let a = build_overlay_filter(&request(position));
            let b = build_overlay_filter(&request(position));
            assert_eq!(a, b);
            assert!(a.ends_with(&format!("overlay={}", position_expression(position))));
        }
    }

    #[test]
    fn test_unrecognized_position_uses_top_left() {
        let fallback = request(Position::from("somewhere"));
        let top_left = request(Position::TopLeft);
        assert_eq!(build_overlay_filter(&fallback), build_overlay_filter(&top_left));
        assert!(build_overlay_filter(&fallback).ends_with("overlay=x=0:y=0"));
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let req = WatermarkRequest::new("in.mp4", "wm.png", "out.mp4")
            .with_scale(250)
            .with_opacity(150);
        let filter = build_overlay_filter(&req);
        assert!(filter.contains("scale2ref=w=main_w*250/100:h=ow/a"));
        assert!(filter.contains("aa=1.50"));
    }
}
