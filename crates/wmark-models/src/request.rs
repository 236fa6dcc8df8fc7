//! Watermark processing requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Where the watermark is placed on the source frame.
///
/// Deserialization is lenient: any unrecognized value maps to `TopLeft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum Position {
    #[default]
    TopLeft,
    Center,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    /// Parse a position name, falling back to `TopLeft`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Position::Center,
            "top-right" => Position::TopRight,
            "bottom-left" => Position::BottomLeft,
            "bottom-right" => Position::BottomRight,
            _ => Position::TopLeft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::Center => "center",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }
}

impl From<String> for Position {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for Position {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to overlay a watermark image onto a media file.
///
/// The engine passes `scale` and `opacity` through uninterpreted;
/// range checks belong to the caller (see [`Validate`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkRequest {
    /// Source media file
    #[validate(length(min = 1, message = "sourcePath is required"))]
    pub source_path: String,
    /// Output file, overwritten if present
    #[validate(length(min = 1, message = "outputPath is required"))]
    pub output_path: String,
    /// Watermark image (PNG with transparency)
    #[validate(length(min = 1, message = "watermarkPath is required"))]
    pub watermark_path: String,
    /// Placement of the watermark
    #[serde(default)]
    pub position: Position,
    /// Watermark width as a percentage
    #[validate(range(min = 1, max = 1000, message = "scale must be between 1 and 1000"))]
    pub scale: i32,
    /// Watermark opacity (0-100)
    #[validate(range(min = 0, max = 100, message = "opacity must be between 0 and 100"))]
    pub opacity: i32,
}

impl WatermarkRequest {
    pub fn new(
        source_path: impl Into<String>,
        watermark_path: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            watermark_path: watermark_path.into(),
            position: Position::default(),
            scale: 100,
            opacity: 100,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: i32) -> Self {
        self.opacity = opacity;
        self
    }
}
