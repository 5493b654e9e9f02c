//! Interview recording upload endpoint

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use super::{ApiError, ApiState};

/// Cap on uploaded recordings (200 MiB)
const UPLOAD_LIMIT: usize = 200 * 1024 * 1024;

/// Build the upload router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .with_state(state)
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub size: u64,
}

async fn upload(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("media") {
            continue;
        }

        let original = field.file_name().unwrap_or("recording.webm").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }

        let filename = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_filename(&original)
        );
        let path = state.uploads_dir.join(&filename);

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;

        tracing::info!(filename = %filename, size = bytes.len(), "recording stored");
        return Ok(Json(UploadResponse {
            filename,
            size: bytes.len() as u64,
        }));
    }

    Err(ApiError::BadRequest("no file uploaded".to_string()))
}

/// Replace anything outside `[A-Za-z0-9._-]` so the name is safe on disk
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "recording.webm".to_string()
    } else {
        cleaned
    }
}
