//! Batch speech-to-text via the hosted speech service
//!
//! Audio goes up as multipart form data; the transcript comes back in one of
//! several response shapes depending on model and mode, so extraction is
//! deliberately tolerant.

use serde_json::Value;

use super::service_language_code;
use crate::question::Language;
use crate::{Error, Result};

/// Speech transcription configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription endpoint URL
    pub url: String,
    /// Speech service API key
    pub api_key: String,
    /// Transcription model identifier
    pub model: String,
    /// Override the per-language mode selection ("transcribe" / "codemix")
    pub mode_override: Option<String>,
    /// Override the per-language language code
    pub language_code_override: Option<String>,
}

/// Transcribes recorded audio to text
#[derive(Debug)]
pub struct SpeechTranscriber {
    http: reqwest::Client,
    config: SttConfig,
}

impl SpeechTranscriber {
    /// Create a new transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: SttConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Unconfigured(
                "speech service API key required for STT".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    /// Transcribe one audio blob
    ///
    /// # Errors
    ///
    /// Returns error when the request fails or no transcript is present in
    /// the response
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        mime: &str,
        language: Language,
    ) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::Stt("empty audio".to_string()));
        }
        let (mode, language_code) = self.request_params(language);

        tracing::debug!(
            audio_bytes = audio.len(),
            mode,
            language_code,
            "starting transcription"
        );

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| Error::Stt(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("mode", mode)
            .text("language_code", language_code);

        let response = self
            .http
            .post(&self.config.url)
            .header("api-subscription-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("speech service error {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("malformed transcription response: {e}")))?;

        extract_transcript(&body)
            .ok_or_else(|| Error::Stt(format!("no transcript in response: {body}")))
    }

    /// Per-language mode and language code, honoring overrides.
    ///
    /// Code-mixed speech uses the service's codemix mode with language
    /// detection left to the service.
    fn request_params(&self, language: Language) -> (String, String) {
        let mode = self.config.mode_override.clone().unwrap_or_else(|| {
            if language == Language::Hinglish {
                "codemix".to_string()
            } else {
                "transcribe".to_string()
            }
        });
        let language_code = self.config.language_code_override.clone().unwrap_or_else(|| {
            if mode == "codemix" {
                "unknown".to_string()
            } else {
                service_language_code(language).to_string()
            }
        });
        (mode, language_code)
    }
}

/// Pull a transcript out of any of the response shapes the service emits
fn extract_transcript(body: &Value) -> Option<String> {
    let candidates = [
        body.get("transcript"),
        body.get("transcript_text"),
        body.get("text"),
        body.get("output_text"),
        body.get("data").and_then(|d| d.get("transcript")),
        body.get("results")
            .and_then(|r| r.get(0))
            .and_then(|r| r.get("transcript")),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}
