//! Voice turn coordination
//!
//! The single authority over whose turn it is to talk and what happens next.
//! Split into a pure state machine ([`machine::TurnMachine`]) that maps
//! `phase x event -> actions`, and an async driver ([`driver::TurnDriver`])
//! that owns the collaborators, executes actions, and feeds completions and
//! timer fires back in as events.

pub mod decision;
pub mod draft;
pub mod driver;
pub mod language;
pub mod machine;

pub use decision::{Decision, TieBreak, classify_decision, is_unknown_answer};
pub use draft::AnswerDraft;
pub use driver::{QuestionService, SpeechInput, SpeechOutput, TurnDriver};
pub use language::detect_language;
pub use machine::{Phase, TurnAction, TurnEvent, TurnMachine};

use std::time::Duration;

use crate::question::Evaluation;

/// Timers owned by the turn controller. At most one of each is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Prolonged silence while listening puts the session on hold
    Hold,
    /// Bounded stop/continue window after feedback
    Decision,
    /// Silence after a partial answer submits it (auto-voice only)
    AutoSubmit,
}

/// Why the voice loop was paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// User pressed pause / teardown
    Requested,
    /// User said (or pressed) stop during a decision window
    Stopped,
}

/// Turn controller tuning
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Speak each question and open a listening window automatically
    pub auto_voice: bool,
    /// Idle-while-listening window before going on hold
    pub hold_timeout: Duration,
    /// Decision window length; expiry defaults to "continue"
    pub decision_timeout: Duration,
    /// Silence-after-speech window before auto-submitting a non-empty draft
    pub auto_submit_timeout: Duration,
    /// Tie-break policy when a transcript matches both intent families
    pub tie_break: TieBreak,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            auto_voice: true,
            hold_timeout: Duration::from_secs(12),
            decision_timeout: Duration::from_millis(3500),
            auto_submit_timeout: Duration::from_secs(8),
            tie_break: TieBreak::PreferContinue,
        }
    }
}

/// The spoken or displayed outcome of one answer
#[derive(Debug, Clone)]
pub enum TurnFeedback {
    /// Scored evaluation
    Evaluated(Evaluation),
    /// Sample answer offered after an "I don't know"
    SampleAnswer(String),
}
