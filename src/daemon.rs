//! Daemon - the studio service
//!
//! Wires configuration, the session store, the HTTP API, and (in interview
//! mode) the live voice turn loop.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::db::{self, DbPool, SessionRepo};
use crate::question::{CoachConfig, InterviewCoach, InterviewSetup, LlmClient};
use crate::retry::RetryPolicy;
use crate::speech::{
    AudioPlayer, LiveRecognizer, SpeechSynthesizer, SpeechTranscriber, SttConfig, TtsConfig,
    VoiceSpeaker,
};
use crate::turn::{PauseReason, TurnDriver, TurnEvent};
use crate::{Error, Result};

/// The Atlas daemon
pub struct Daemon {
    config: Config,
    db: DbPool,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.data_dir.join("atlas.db");
        let db = db::init(&db_path)?;
        tracing::info!(path = %db_path.display(), "database initialized");
        Ok(Self { config, db })
    }

    /// Run the API server until interrupted
    ///
    /// # Errors
    ///
    /// Returns error on a fatal server error
    pub async fn run(self) -> Result<()> {
        let state = self.build_state()?;
        let server = ApiServer::new(state, self.config.server.port);
        let handle = server.spawn();

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Config(format!("failed to listen for shutdown: {e}")))?;
        tracing::info!("shutdown requested");
        handle.abort();
        Ok(())
    }

    /// Run a live voice interview alongside the API server
    ///
    /// Blocks until the session stops (spoken "stop", decision windows, or
    /// ctrl-c) and reports how it ended.
    ///
    /// # Errors
    ///
    /// Returns error when the speech service or audio devices are
    /// unavailable
    pub async fn run_interview(self, setup: InterviewSetup) -> Result<()> {
        if !self.config.speech.is_configured() {
            return Err(Error::Unconfigured(
                "voice interviews need a speech service API key".to_string(),
            ));
        }

        let state = self.build_state()?;
        let coach = Arc::clone(&state.coach);
        let synthesizer = state
            .synthesizer
            .clone()
            .ok_or_else(|| Error::Unconfigured("TTS is not configured".to_string()))?;
        let transcriber = state
            .transcriber
            .clone()
            .ok_or_else(|| Error::Unconfigured("STT is not configured".to_string()))?;

        let api_handle = ApiServer::new(state, self.config.server.port).spawn();

        let player = Arc::new(AudioPlayer::new()?);
        let speaker = Arc::new(VoiceSpeaker::new(synthesizer, player));

        let (events_tx, events_rx) = mpsc::channel(64);
        let recognizer = Arc::new(LiveRecognizer::new(
            events_tx.clone(),
            transcriber,
            setup.language,
        ));

        let (driver, commands) = TurnDriver::from_parts(
            setup,
            self.config.voice.turn_options(),
            coach,
            recognizer,
            speaker,
            events_tx,
            events_rx,
        );

        // ctrl-c pauses the loop, which terminates the driver cleanly.
        let shutdown_commands = commands.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_commands
                    .send(TurnEvent::PauseRequested {
                        reason: PauseReason::Requested,
                    })
                    .await;
            }
        });

        tracing::info!("interview loop started");
        let machine = driver.run().await;
        if machine.stopped() {
            tracing::info!("interview stopped by request");
        } else {
            tracing::info!("interview paused");
        }

        api_handle.abort();
        Ok(())
    }

    /// Build the shared API state from configuration
    fn build_state(&self) -> Result<Arc<ApiState>> {
        let sessions = SessionRepo::new(self.db.clone())
            .with_question_limit(self.config.session.question_limit);

        let llm = LlmClient::new(
            &self.config.llm.base_url,
            self.config.llm.api_key.clone(),
            self.config.llm.model.clone(),
            self.config.llm.timeout,
            RetryPolicy::default(),
        )?;
        let coach = Arc::new(InterviewCoach::new(
            llm,
            sessions.clone(),
            CoachConfig {
                question_limit: self.config.session.question_limit,
                similarity_threshold: self.config.session.similarity_threshold,
                generation_attempts: self.config.llm.retry_limit,
                ..CoachConfig::default()
            },
        ));

        if !coach.is_configured() {
            tracing::warn!("LLM API key missing - question generation disabled");
        }

        let (synthesizer, transcriber) = if self.config.speech.is_configured() {
            let tts = SpeechSynthesizer::new(TtsConfig {
                url: self.config.speech.tts_url.clone(),
                api_key: self.config.speech.api_key.clone(),
                model: self.config.speech.tts_model.clone(),
                speaker: self.config.speech.speaker.clone(),
                pace: self.config.speech.pace,
                sample_rate: self.config.speech.sample_rate,
                codec: self.config.speech.codec.clone(),
                enable_preprocessing: true,
            })?;
            let stt = SpeechTranscriber::new(SttConfig {
                url: self.config.speech.stt_url.clone(),
                api_key: self.config.speech.api_key.clone(),
                model: self.config.speech.stt_model.clone(),
                mode_override: self.config.speech.stt_mode.clone(),
                language_code_override: self.config.speech.stt_language_code.clone(),
            })?;
            (Some(Arc::new(tts)), Some(Arc::new(stt)))
        } else {
            tracing::warn!("speech service API key missing - TTS/STT disabled");
            (None, None)
        };

        Ok(Arc::new(ApiState {
            coach,
            sessions,
            synthesizer,
            transcriber,
            uploads_dir: self.config.uploads_dir.clone(),
            session_limit: self.config.session.session_limit,
        }))
    }
}
