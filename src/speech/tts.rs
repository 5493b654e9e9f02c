//! Text-to-speech via the hosted speech service
//!
//! Synthesis returns base64-encoded audio plus a format tag, matching what
//! browser and API clients consume. The [`VoiceSpeaker`] wraps synthesis and
//! local playback into the turn controller's speech-output contract, with
//! mid-playback cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use super::playback::AudioPlayer;
use super::service_language_code;
use crate::question::Language;
use crate::turn::SpeechOutput;
use crate::{Error, Result};

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Synthesis endpoint URL
    pub url: String,
    /// Speech service API key
    pub api_key: String,
    /// Voice model identifier
    pub model: String,
    /// Speaker voice name
    pub speaker: String,
    /// Speaking pace multiplier
    pub pace: f64,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output audio codec tag ("mp3")
    pub codec: String,
    /// Let the service normalize numbers and abbreviations
    pub enable_preprocessing: bool,
}

/// Synthesized audio as sent to clients
#[derive(Debug, Clone, serde::Serialize)]
pub struct SynthesizedAudio {
    pub audio_base64: String,
    pub format: String,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    target_language_code: &'a str,
    speaker: &'a str,
    model: &'a str,
    pace: f64,
    speech_sample_rate: u32,
    output_audio_codec: &'a str,
    enable_preprocessing: bool,
}

/// Synthesizes speech from text
pub struct SpeechSynthesizer {
    http: reqwest::Client,
    config: TtsConfig,
}

impl SpeechSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: TtsConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Unconfigured(
                "speech service API key required for TTS".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    /// Synthesize text to audio
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the service returns no audio
    pub async fn synthesize(&self, text: &str, language: Language) -> Result<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Tts("empty text".to_string()));
        }

        let request = SynthesisRequest {
            text,
            target_language_code: service_language_code(language),
            speaker: &self.config.speaker,
            model: &self.config.model,
            pace: self.config.pace,
            speech_sample_rate: self.config.sample_rate,
            output_audio_codec: &self.config.codec,
            enable_preprocessing: self.config.enable_preprocessing,
        };

        let response = self
            .http
            .post(&self.config.url)
            .header("api-subscription-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech service error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Tts("speech service returned empty audio".to_string()));
        }

        tracing::debug!(bytes = audio.len(), codec = %self.config.codec, "synthesis complete");
        Ok(SynthesizedAudio {
            audio_base64: BASE64.encode(&audio),
            format: self.config.codec.clone(),
        })
    }
}

/// Flatten text for speech: drop list punctuation, soften clause breaks, and
/// pad sentence ends for Hindi-family pacing.
#[must_use]
pub fn humanize_speech_text(text: &str, language: Language) -> String {
    let mut softened = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ':' | ';' => softened.push_str(", "),
            '-' | '\n' | '\r' => softened.push(' '),
            _ => softened.push(c),
        }
    }
    let collapsed = softened.split_whitespace().collect::<Vec<_>>().join(" ");

    if language.is_hindi_family() {
        collapsed.replace('?', "? ").replace('.', ". ").trim_end().to_string()
    } else {
        collapsed
    }
}

/// Speech output collaborator: synthesize then play to completion, with
/// preemption. A new `speak` call supersedes any in-flight one.
pub struct VoiceSpeaker {
    synthesizer: Arc<SpeechSynthesizer>,
    player: Arc<AudioPlayer>,
    epoch: AtomicU64,
}

impl VoiceSpeaker {
    /// Create a speaker over a synthesizer and player
    #[must_use]
    pub fn new(synthesizer: Arc<SpeechSynthesizer>, player: Arc<AudioPlayer>) -> Self {
        Self {
            synthesizer,
            player,
            epoch: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl SpeechOutput for VoiceSpeaker {
    async fn speak(&self, text: &str, language: Language) -> Result<bool> {
        // Preempt whatever is currently playing.
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.player.stop();

        let prepared = humanize_speech_text(text, language);
        if prepared.is_empty() {
            return Ok(false);
        }

        let audio = self.synthesizer.synthesize(&prepared, language).await?;
        if self.epoch.load(Ordering::SeqCst) != my_epoch {
            // A newer utterance or a cancel arrived while synthesizing.
            return Ok(false);
        }

        let bytes = BASE64
            .decode(audio.audio_base64.as_bytes())
            .map_err(|e| Error::Tts(format!("invalid audio payload: {e}")))?;
        self.player.play_encoded(&bytes, &audio.format).await?;
        Ok(true)
    }

    fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.player.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str) -> TtsConfig {
        TtsConfig {
            url: "https://example.invalid/tts".to_string(),
            api_key: key.to_string(),
            model: "bulbul:v3".to_string(),
            speaker: "shreya".to_string(),
            pace: 1.1,
            sample_rate: 22050,
            codec: "mp3".to_string(),
            enable_preprocessing: true,
        }
    }

    #[test]
    fn missing_key_is_unconfigured() {
        assert!(matches!(
            SpeechSynthesizer::new(config(" ")),
            Err(Error::Unconfigured(_))
        ));
        assert!(SpeechSynthesizer::new(config("k")).is_ok());
    }

    #[test]
    fn humanize_softens_clause_breaks() {
        assert_eq!(
            humanize_speech_text("First: think.\nThen - answer; briefly.", Language::En),
            "First, think. Then answer, briefly."
        );
    }

    #[test]
    fn humanize_pads_sentence_ends_for_hindi() {
        let out = humanize_speech_text("ठीक है?आगे बढ़ते हैं.", Language::Hi);
        assert!(out.contains("? "));
        assert!(!out.ends_with(' '));
    }

    #[test]
    fn humanize_collapses_whitespace() {
        assert_eq!(
            humanize_speech_text("  a   lot\n\nof space ", Language::En),
            "a lot of space"
        );
    }
}
