//! Error types for the Atlas studio

use thiserror::Error;

/// Result type alias for Atlas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Atlas studio
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A required collaborator is not configured (missing API key, disabled feature)
    #[error("not configured: {0}")]
    Unconfigured(String),

    /// Question generation error
    #[error("question error: {0}")]
    Question(String),

    /// Answer evaluation error
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Upstream service rejected the request or returned a malformed response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Upstream service rate limit
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Upstream request timed out
    #[error("timed out: {0}")]
    Timeout(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Media upload error
    #[error("upload error: {0}")]
    Upload(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether a bounded retry is worth attempting for this error
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout(_) | Self::Upstream(_) | Self::Http(_)
        )
    }
}
