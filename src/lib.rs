//! Atlas Studio - voice-driven mock interview studio
//!
//! This library provides the core functionality for the Atlas studio:
//! - The voice turn controller (turn-taking state machine and driver)
//! - Question generation and answer evaluation over a hosted LLM
//! - Speech synthesis/transcription clients and local audio plumbing
//! - Session memory persistence
//! - The HTTP API the browser client talks to
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Interfaces                         │
//! │      HTTP API (browser client)  │  Local voice loop │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Atlas Studio                         │
//! │  Turn machine │ Coach │ Sessions │ Speech clients   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Hosted services                         │
//! │        LLM (questions/evaluation) │ TTS │ STT       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod question;
pub mod retry;
pub mod speech;
pub mod turn;

pub use config::Config;
pub use daemon::Daemon;
pub use db::{DbConn, DbPool, SessionRepo};
pub use error::{Error, Result};
pub use question::{Evaluation, InterviewCoach, InterviewSetup, Language, Level, Track};
pub use retry::RetryPolicy;
pub use turn::{
    Decision, Phase, QuestionService, SpeechInput, SpeechOutput, TieBreak, TurnDriver, TurnEvent,
    TurnMachine, TurnOptions,
};
