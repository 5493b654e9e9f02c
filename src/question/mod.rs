//! Question generation and answer evaluation
//!
//! The interview "brain": an OpenAI-compatible chat client plus the prompt
//! construction, question-candidate extraction, and near-duplicate rejection
//! that keep a session from repeating itself.

mod client;
mod coach;
mod extract;
mod fallback;
pub mod prompts;
pub mod similarity;

pub use client::{CompletionParams, LlmClient, parse_evaluation};
pub use coach::{CoachConfig, InterviewCoach};
pub use extract::extract_question_candidate;
pub use fallback::{local_evaluation, local_sample_answer};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Interview track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Track {
    SystemDesign,
    MlFundamentals,
    Behavioral,
    ProductSense,
}

impl Track {
    /// Display name, matching the studio UI labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemDesign => "System Design",
            Self::MlFundamentals => "ML Fundamentals",
            Self::Behavioral => "Behavioral",
            Self::ProductSense => "Product Sense",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.contains("system design") {
            Ok(Self::SystemDesign)
        } else if normalized.contains("ml fundamental") || normalized.contains("machine learning") {
            Ok(Self::MlFundamentals)
        } else if normalized.contains("behavioral") || normalized.contains("behavioural") {
            Ok(Self::Behavioral)
        } else if normalized.contains("product") {
            Ok(Self::ProductSense)
        } else {
            Err(Error::Config(format!("unknown track: {s}")))
        }
    }
}

impl TryFrom<String> for Track {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Track> for String {
    fn from(t: Track) -> Self {
        t.as_str().to_string()
    }
}

/// Interview seniority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Entry,
    Mid,
    Senior,
    Staff,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Mid => "Mid",
            Self::Senior => "Senior",
            Self::Staff => "Staff",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(Self::Entry),
            "mid" => Ok(Self::Mid),
            "senior" => Ok(Self::Senior),
            "staff" => Ok(Self::Staff),
            _ => Err(Error::Config(format!("unknown level: {s}"))),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Level> for String {
    fn from(l: Level) -> Self {
        l.as_str().to_string()
    }
}

/// Assistant language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Hinglish,
}

impl Language {
    /// Wire value used in API payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Hinglish => "hinglish",
        }
    }

    /// Whether the assistant speaks a Hindi-family language
    #[must_use]
    pub const fn is_hindi_family(self) -> bool {
        matches!(self, Self::Hi | Self::Hinglish)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "en" | "english" => Ok(Self::En),
            "hi" | "hindi" => Ok(Self::Hi),
            "hinglish" => Ok(Self::Hinglish),
            _ => Err(Error::Config(format!("unknown language: {s}"))),
        }
    }
}

/// What one interview session is about: who is being interviewed, for what,
/// and in which language. The session id keys server-side question memory.
#[derive(Debug, Clone)]
pub struct InterviewSetup {
    pub role: String,
    pub track: Track,
    pub level: Level,
    pub language: Language,
    pub session_id: String,
}

/// Result of evaluating a candidate answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Score from 0 to 100
    pub score: u8,
    /// Conversational feedback in the session language
    pub feedback: String,
    /// True when the score came from the local heuristic, not the LLM
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}
