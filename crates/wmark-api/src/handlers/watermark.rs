//! Watermark image storage.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::response::ApiResponse;
use crate::state::AppState;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Base64 watermark upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWatermarkRequest {
    /// PNG bytes, base64 encoded, optionally as a `data:` URL
    pub image_data: String,
}

/// Decode the request payload into PNG bytes.
fn decode_image_data(data: &str) -> ApiResult<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ApiError::bad_request("Invalid image data"))?;

    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(ApiError::bad_request("Watermark must be a PNG image"));
    }

    Ok(bytes)
}

/// Save a watermark image and return the path it was written to.
pub async fn save_watermark(
    State(state): State<AppState>,
    Json(request): Json<SaveWatermarkRequest>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let bytes = decode_image_data(&request.image_data)?;

    let dir = &state.config.watermark_dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        ApiError::internal(format!(
            "Failed to create watermark directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let path = dir.join(format!("watermark_{}.png", Uuid::new_v4().simple()));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save watermark: {}", e)))?;

    metrics::record_watermark_saved();
    info!(path = %path.display(), bytes = bytes.len(), "Saved watermark image");

    Ok(Json(ApiResponse::with_message(
        "Watermark saved successfully",
        path.to_string_lossy().into_owned(),
    )))
}
