//! Media previews for the file picker.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::{Query, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use wmark_media::{parse_timepoint, MediaKind, DEFAULT_TIMEPOINT};

use crate::error::{ApiError, ApiResult};
use crate::handlers::files::{ensure_file, serve_file};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub path: Option<String>,
    /// Seek position for videos, seconds or `HH:MM:SS`; defaults to 1s
    pub timepoint: Option<String>,
}

/// Preview an image or a video.
///
/// Images are returned as they are. Videos return one JPEG frame grabbed at
/// `timepoint`; the frame file is removed once read.
pub async fn preview_media(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
    request: Request,
) -> ApiResult<Response> {
    let path = query
        .path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::bad_request("No file path provided"))?;
    ensure_file(&path).await?;

    match MediaKind::from_path(&path) {
        Some(MediaKind::Image) => serve_file(&path, request).await,
        Some(MediaKind::Video) => {
            let timepoint = query.timepoint.as_deref().unwrap_or(DEFAULT_TIMEPOINT);
            let seconds =
                parse_timepoint(timepoint).map_err(|e| ApiError::bad_request(e.to_string()))?;
            let frame = grab_frame(&state, &path, seconds).await?;
            Ok(([(header::CONTENT_TYPE, "image/jpeg")], frame).into_response())
        }
        None => Err(ApiError::bad_request(format!(
            "Unsupported file type: {}",
            path.display()
        ))),
    }
}

async fn grab_frame(state: &AppState, source: &Path, seconds: f64) -> ApiResult<Vec<u8>> {
    let dir = &state.config.preview_dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        ApiError::internal(format!(
            "Failed to create preview directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let frame = dir.join(format!("preview_{}.jpg", Uuid::new_v4().simple()));
    let bytes = match state.supervisor.capture_frame(source, seconds, &frame).await {
        Ok(()) => tokio::fs::read(&frame)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to read preview frame: {}", e))),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = tokio::fs::remove_file(&frame).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %frame.display(), error = %e, "Failed to remove preview frame");
        }
    }

    bytes
}
