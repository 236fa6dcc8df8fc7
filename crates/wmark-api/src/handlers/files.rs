//! File picker support: directory listing, uploads and raw file access.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as UrlPath, Query, Request, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Query parameters for the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    /// Directory to list; defaults to the working directory
    #[serde(default)]
    pub path: Option<String>,
}

/// One directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    /// Last modification, seconds since the Unix epoch
    pub mod_time: i64,
}

/// List a directory, directories first then by name.
pub async fn list_files(
    Query(query): Query<ListFilesQuery>,
) -> ApiResult<Json<ApiResponse<Vec<FileEntry>>>> {
    let dir = query
        .path
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| ".".to_string());

    let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ApiError::not_found(format!("Directory not found: {}", dir)),
        _ => ApiError::internal(format!("Failed to read directory {}: {}", dir, e)),
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read directory {}: {}", dir, e)))?
    {
        // Entries removed while listing are skipped
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let mod_time = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp())
            .unwrap_or(0);

        files.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_string_lossy().into_owned(),
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            mod_time,
        });
    }

    files.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    Ok(Json(ApiResponse::success(files)))
}

/// Store the `file` field of a multipart form under the upload directory.
///
/// Only the final component of the client's file name is kept. An existing
/// file with the same name is replaced.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<FileEntry>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .and_then(|n| Path::new(n).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no name"))?;

        let dir = &state.config.upload_dir;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            ApiError::internal(format!(
                "Failed to create upload directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let path = dir.join(&name);
        let size = match write_field(field, &path).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
                }
                return Err(e);
            }
        };

        metrics::record_upload(size);
        info!(path = %path.display(), bytes = size, "Stored upload");

        return Ok(Json(ApiResponse::with_message(
            "File uploaded successfully",
            FileEntry {
                name,
                path: path.to_string_lossy().into_owned(),
                size,
                is_dir: false,
                mod_time: Utc::now().timestamp(),
            },
        )));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// Stream a multipart field to `path`, returning the bytes written.
async fn write_field(mut field: Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save file: {}", e)))?;

    let mut size = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {}", e.body_text())))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to save file: {}", e)))?;
        size += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save file: {}", e)))?;
    Ok(size)
}

/// Serve a file by absolute path: `/api/files/home/me/logo.png` reads
/// `/home/me/logo.png`.
pub async fn get_file(UrlPath(path): UrlPath<String>, request: Request) -> ApiResult<Response> {
    let path = PathBuf::from(format!("/{}", path.trim_start_matches('/')));
    ensure_file(&path).await?;
    serve_file(&path, request).await
}

/// Fail with 404 unless `path` is an existing regular file.
pub(crate) async fn ensure_file(path: &Path) -> ApiResult<()> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ApiError::not_found(format!("File not found: {}", path.display())),
        _ => ApiError::internal(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    if !metadata.is_file() {
        return Err(ApiError::bad_request(format!(
            "Not a regular file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Answer `request` with the contents of `path`, content type guessed from
/// the extension. Range and conditional requests are honored.
pub(crate) async fn serve_file(path: &Path, request: Request) -> ApiResult<Response> {
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.map(Body::new))
}
