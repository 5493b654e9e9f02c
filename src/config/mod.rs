//! Configuration management for the Atlas studio

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::turn::{TieBreak, TurnOptions};
use crate::{Error, Result};

use self::file::AtlasConfigFile;

/// Atlas studio configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the data directory (database, uploads)
    pub data_dir: PathBuf,

    /// Directory for uploaded interview recordings
    pub uploads_dir: PathBuf,

    /// LLM configuration
    pub llm: LlmConfig,

    /// Speech service configuration
    pub speech: SpeechConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Session memory configuration
    pub session: SessionConfig,

    /// Voice loop configuration
    pub voice: VoiceConfig,
}

/// LLM (question/evaluation) configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key; empty disables question generation
    pub api_key: String,

    /// OpenAI-compatible API root
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Request timeout
    pub timeout: Duration,

    /// Generation attempts before giving up on a unique question
    pub retry_limit: u32,
}

/// Speech service configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// API key; empty disables TTS and STT
    pub api_key: String,

    /// TTS endpoint URL
    pub tts_url: String,

    /// STT endpoint URL
    pub stt_url: String,

    /// TTS voice model
    pub tts_model: String,

    /// TTS speaker voice
    pub speaker: String,

    /// TTS pace multiplier
    pub pace: f64,

    /// TTS output sample rate in Hz
    pub sample_rate: u32,

    /// TTS output codec tag
    pub codec: String,

    /// STT model
    pub stt_model: String,

    /// STT mode override
    pub stt_mode: Option<String>,

    /// STT language code override
    pub stt_language_code: Option<String>,
}

impl SpeechConfig {
    /// Whether the speech service is usable
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Session memory configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum sessions kept before pruning
    pub session_limit: usize,

    /// Asked questions remembered per session
    pub question_limit: usize,

    /// Jaccard similarity threshold for duplicate questions
    pub similarity_threshold: f64,
}

/// Voice loop configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Speak questions and open listening windows automatically
    pub auto_voice: bool,

    /// Idle-while-listening window before going on hold
    pub hold_timeout: Duration,

    /// Decision window length
    pub decision_timeout: Duration,

    /// Silence-after-speech window before auto-submit
    pub auto_submit_timeout: Duration,

    /// Tie-break when a transcript matches both intent families
    pub decision_tie_break: TieBreak,
}

impl VoiceConfig {
    /// Turn controller options derived from this configuration
    #[must_use]
    pub const fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            auto_voice: self.auto_voice,
            hold_timeout: self.hold_timeout,
            decision_timeout: self.decision_timeout,
            auto_submit_timeout: self.auto_submit_timeout,
            tie_break: self.decision_tie_break,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file overlay, then
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed, or the
    /// data directory cannot be determined
    pub fn load(data_dir_override: Option<PathBuf>, port_override: Option<u16>) -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "interviewatlas", "atlas-studio");

        let file_config = dirs
            .as_ref()
            .map(|d| d.config_dir().join("config.toml"))
            .filter(|path| path.exists())
            .map(|path| -> Result<AtlasConfigFile> {
                let raw = std::fs::read_to_string(&path)?;
                let parsed = toml::from_str(&raw)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Ok(parsed)
            })
            .transpose()?
            .unwrap_or_default();

        let data_dir = data_dir_override
            .or_else(|| dirs.as_ref().map(|d| d.data_dir().to_path_buf()))
            .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?;
        std::fs::create_dir_all(&data_dir)?;
        let uploads_dir = data_dir.join("uploads");
        std::fs::create_dir_all(&uploads_dir)?;

        let llm = LlmConfig {
            api_key: env_or("ATLAS_LLM_API_KEY", file_config.llm.api_key, String::new()),
            base_url: env_or(
                "ATLAS_LLM_BASE_URL",
                file_config.llm.base_url,
                "https://api.groq.com/openai/v1".to_string(),
            ),
            model: env_or(
                "ATLAS_LLM_MODEL",
                file_config.llm.model,
                "openai/gpt-oss-120b".to_string(),
            ),
            timeout: Duration::from_millis(
                parsed_env("ATLAS_LLM_TIMEOUT_MS")
                    .or(file_config.llm.timeout_ms)
                    .unwrap_or(25_000),
            ),
            retry_limit: parsed_env("ATLAS_LLM_RETRY_LIMIT")
                .or(file_config.llm.retry_limit)
                .unwrap_or(5),
        };

        let speech = SpeechConfig {
            api_key: env_or(
                "ATLAS_SPEECH_API_KEY",
                file_config.speech.api_key,
                String::new(),
            ),
            tts_url: env_or(
                "ATLAS_SPEECH_TTS_URL",
                file_config.speech.tts_url,
                "https://api.sarvam.ai/text-to-speech/stream".to_string(),
            ),
            stt_url: env_or(
                "ATLAS_SPEECH_STT_URL",
                file_config.speech.stt_url,
                "https://api.sarvam.ai/speech-to-text".to_string(),
            ),
            tts_model: file_config.speech.tts_model.unwrap_or_else(|| "bulbul:v3".to_string()),
            speaker: file_config.speech.speaker.unwrap_or_else(|| "shreya".to_string()),
            pace: file_config.speech.pace.unwrap_or(1.1),
            sample_rate: file_config.speech.sample_rate.unwrap_or(22_050),
            codec: file_config.speech.codec.unwrap_or_else(|| "mp3".to_string()),
            stt_model: file_config.speech.stt_model.unwrap_or_else(|| "saaras:v3".to_string()),
            stt_mode: file_config.speech.stt_mode,
            stt_language_code: file_config.speech.stt_language_code,
        };

        let server = ServerConfig {
            port: port_override
                .or_else(|| parsed_env("ATLAS_PORT"))
                .or(file_config.server.port)
                .unwrap_or(5050),
        };

        let session = SessionConfig {
            session_limit: file_config.session.session_limit.unwrap_or(100),
            question_limit: file_config.session.question_limit.unwrap_or(40),
            similarity_threshold: file_config.session.similarity_threshold.unwrap_or(0.58),
        };

        let voice = VoiceConfig {
            auto_voice: file_config.voice.auto_voice.unwrap_or(true),
            hold_timeout: duration_from_secs(file_config.voice.hold_secs, 12.0),
            decision_timeout: duration_from_secs(file_config.voice.decision_secs, 3.5),
            auto_submit_timeout: duration_from_secs(file_config.voice.auto_submit_secs, 8.0),
            decision_tie_break: parse_tie_break(file_config.voice.decision_tie_break.as_deref())?,
        };

        Ok(Self {
            data_dir,
            uploads_dir,
            llm,
            speech,
            server,
            session,
            voice,
        })
    }
}

fn env_or(key: &str, file_value: Option<String>, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(file_value)
        .unwrap_or(default)
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn duration_from_secs(value: Option<f64>, default: f64) -> Duration {
    Duration::from_secs_f64(value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(default))
}

fn parse_tie_break(value: Option<&str>) -> Result<TieBreak> {
    match value.map(str::trim).map(str::to_lowercase).as_deref() {
        None | Some("" | "continue") => Ok(TieBreak::PreferContinue),
        Some("stop") => Ok(TieBreak::PreferStop),
        Some(other) => Err(Error::Config(format!(
            "decision_tie_break must be \"continue\" or \"stop\", got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_parsing() {
        assert_eq!(parse_tie_break(None).unwrap(), TieBreak::PreferContinue);
        assert_eq!(parse_tie_break(Some("stop")).unwrap(), TieBreak::PreferStop);
        assert_eq!(
            parse_tie_break(Some(" Continue ")).unwrap(),
            TieBreak::PreferContinue
        );
        assert!(parse_tie_break(Some("maybe")).is_err());
    }

    #[test]
    fn durations_reject_nonsense() {
        assert_eq!(duration_from_secs(Some(-1.0), 12.0), Duration::from_secs(12));
        assert_eq!(duration_from_secs(Some(f64::NAN), 12.0), Duration::from_secs(12));
        assert_eq!(duration_from_secs(Some(2.5), 12.0), Duration::from_millis(2500));
    }

    #[test]
    fn voice_config_maps_to_turn_options() {
        let voice = VoiceConfig {
            auto_voice: false,
            hold_timeout: Duration::from_secs(12),
            decision_timeout: Duration::from_millis(3500),
            auto_submit_timeout: Duration::from_secs(8),
            decision_tie_break: TieBreak::PreferStop,
        };
        let options = voice.turn_options();
        assert!(!options.auto_voice);
        assert_eq!(options.decision_timeout, Duration::from_millis(3500));
        assert_eq!(options.tie_break, TieBreak::PreferStop);
    }
}
