//! Speech synthesis and transcription endpoints

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::question::Language;
use crate::speech::SynthesizedAudio;

/// Cap on uploaded transcription audio
const TRANSCRIBE_LIMIT: usize = 25 * 1024 * 1024;

/// Build the voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/voice", post(synthesize))
        .route(
            "/api/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(TRANSCRIBE_LIMIT)),
        )
        .with_state(state)
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub language: String,
}

/// Transcription response
#[derive(Debug, serde::Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizedAudio>, ApiError> {
    let synthesizer = state
        .synthesizer
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("TTS is not configured".to_string()))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }
    let language: Language = request
        .language
        .parse()
        .map_err(|e: crate::Error| ApiError::BadRequest(e.to_string()))?;

    let audio = synthesizer.synthesize(&request.text, language).await?;
    Ok(Json(audio))
}

async fn transcribe(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let transcriber = state
        .transcriber
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("STT is not configured".to_string()))?;

    let mut audio: Option<(Vec<u8>, String, String)> = None;
    let mut language = Language::En;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let filename = field
                    .file_name()
                    .unwrap_or("audio.webm")
                    .to_string();
                let mime = field
                    .content_type()
                    .unwrap_or("audio/webm")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read audio: {e}")))?;
                audio = Some((bytes.to_vec(), filename, mime));
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read language: {e}")))?;
                language = value
                    .parse()
                    .map_err(|e: crate::Error| ApiError::BadRequest(e.to_string()))?;
            }
            _ => {}
        }
    }

    let (bytes, filename, mime) =
        audio.ok_or_else(|| ApiError::BadRequest("audio file is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("audio file is empty".to_string()));
    }

    let transcript = transcriber
        .transcribe(bytes, &filename, &mime, language)
        .await?;
    Ok(Json(TranscribeResponse { transcript }))
}
