//! TOML configuration file loading
//!
//! Supports `~/.config/atlas-studio/config.toml` as a persistent config
//! source. All fields are optional: the file is a partial overlay on top of
//! defaults, and environment variables override both.

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AtlasConfigFile {
    /// LLM (question/evaluation) configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech service configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Session memory configuration
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Voice loop configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// API key for the OpenAI-compatible endpoint
    pub api_key: Option<String>,

    /// API root (e.g. "https://api.groq.com/openai/v1")
    pub base_url: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Generation attempts before giving up on a unique question
    pub retry_limit: Option<u32>,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Speech service API key (shared by TTS and STT)
    pub api_key: Option<String>,

    /// TTS endpoint URL
    pub tts_url: Option<String>,

    /// STT endpoint URL
    pub stt_url: Option<String>,

    /// TTS voice model
    pub tts_model: Option<String>,

    /// TTS speaker voice
    pub speaker: Option<String>,

    /// TTS pace multiplier
    pub pace: Option<f64>,

    /// TTS output sample rate in Hz
    pub sample_rate: Option<u32>,

    /// TTS output codec tag
    pub codec: Option<String>,

    /// STT model
    pub stt_model: Option<String>,

    /// STT mode override ("transcribe" / "codemix")
    pub stt_mode: Option<String>,

    /// STT language code override
    pub stt_language_code: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,
}

/// Session memory configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Maximum sessions kept before pruning
    pub session_limit: Option<usize>,

    /// Asked questions remembered per session
    pub question_limit: Option<usize>,

    /// Jaccard similarity threshold for duplicate questions
    pub similarity_threshold: Option<f64>,
}

/// Voice loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Speak questions and open listening windows automatically
    pub auto_voice: Option<bool>,

    /// Idle-while-listening seconds before going on hold
    pub hold_secs: Option<f64>,

    /// Decision window length in seconds
    pub decision_secs: Option<f64>,

    /// Silence-after-speech seconds before auto-submit
    pub auto_submit_secs: Option<f64>,

    /// Tie-break when a transcript matches both intent families
    /// ("continue" or "stop")
    pub decision_tie_break: Option<String>,
}
