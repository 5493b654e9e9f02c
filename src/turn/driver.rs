//! Async driver for the turn state machine
//!
//! Owns the collaborators and the event channel. Actions returned by the
//! machine are executed here; completions, recognition updates, and timer
//! fires come back as events on the same channel, so the machine is only
//! ever touched from this one loop.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::machine::{Phase, TurnAction, TurnEvent, TurnMachine};
use super::{TimerKind, TurnOptions};
use crate::question::{Evaluation, InterviewSetup, Language};
use crate::Result;

/// Recently asked questions the driver echoes back to the question service
const RECENT_QUESTION_LIMIT: usize = 20;

/// Question/evaluation service contract consumed by the turn controller
#[async_trait]
pub trait QuestionService: Send + Sync {
    /// Next interview question, avoiding anything in `recent`
    async fn next_question(&self, setup: &InterviewSetup, recent: &[String]) -> Result<String>;

    /// Follow-up question probing `answer`
    async fn follow_up(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<String>;

    /// Score an answer from 0 to 100 with feedback
    async fn evaluate(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<Evaluation>;

    /// A strong sample answer for the question
    async fn sample_answer(&self, setup: &InterviewSetup, question: &str) -> Result<String>;
}

/// Streaming speech recognition contract
///
/// `start` opens a recognition session that emits `TranscriptUpdate`,
/// `RecognitionEnded`, and `RecognitionFailed` events into the turn event
/// channel. `stop` requests termination and must be a no-op when no session
/// is active, including when no result has arrived yet.
pub trait SpeechInput: Send + Sync {
    /// Open a recognition session
    ///
    /// # Errors
    ///
    /// Returns error if the audio device cannot be opened
    fn start(&self) -> Result<()>;

    /// Request termination of the current session (no-op when idle)
    fn stop(&self);
}

/// Speech synthesis contract
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Synthesize and play to completion; returns whether audio was played
    async fn speak(&self, text: &str, language: Language) -> Result<bool>;

    /// Preempt any in-flight synthesis or playback
    fn cancel(&self);
}

/// Async driver around a [`TurnMachine`]
pub struct TurnDriver {
    machine: TurnMachine,
    events_tx: mpsc::Sender<TurnEvent>,
    events_rx: mpsc::Receiver<TurnEvent>,
    questions: Arc<dyn QuestionService>,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    recent_questions: Vec<String>,
    last_status: String,
}

impl TurnDriver {
    /// Create a driver; the returned sender injects user events (submit,
    /// pause, dictation toggles) into the loop.
    #[must_use]
    pub fn new(
        setup: InterviewSetup,
        options: TurnOptions,
        questions: Arc<dyn QuestionService>,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> (Self, mpsc::Sender<TurnEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self::from_parts(setup, options, questions, input, output, events_tx, events_rx)
    }

    /// Create a driver over an existing event channel
    ///
    /// Used when a collaborator (e.g. a live recognizer) must hold the
    /// sender before the driver exists.
    #[must_use]
    pub fn from_parts(
        setup: InterviewSetup,
        options: TurnOptions,
        questions: Arc<dyn QuestionService>,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
        events_tx: mpsc::Sender<TurnEvent>,
        events_rx: mpsc::Receiver<TurnEvent>,
    ) -> (Self, mpsc::Sender<TurnEvent>) {
        let driver = Self {
            machine: TurnMachine::new(setup, options),
            events_tx: events_tx.clone(),
            events_rx,
            questions,
            input,
            output,
            recent_questions: Vec::new(),
            last_status: String::new(),
        };
        (driver, events_tx)
    }

    /// A sender for injecting events from outside the loop
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<TurnEvent> {
        self.events_tx.clone()
    }

    /// Last status line the machine surfaced
    #[must_use]
    pub fn last_status(&self) -> &str {
        &self.last_status
    }

    /// Run the interview loop until the session pauses
    ///
    /// Consumes the driver and returns the final machine state for
    /// inspection.
    pub async fn run(mut self) -> TurnMachine {
        let _ = self.events_tx.send(TurnEvent::StartRequested).await;

        while let Some(event) = self.events_rx.recv().await {
            self.step(event);
            if self.machine.phase() == Phase::Paused {
                break;
            }
        }
        self.machine
    }

    /// Apply one event and execute the resulting actions
    pub fn step(&mut self, event: TurnEvent) {
        if let TurnEvent::QuestionReady { question } = &event {
            self.remember_question(question);
        }
        let actions = self.machine.handle(event);
        for action in actions {
            self.dispatch(action);
        }
    }

    fn remember_question(&mut self, question: &str) {
        self.recent_questions.retain(|q| q != question);
        self.recent_questions.push(question.to_string());
        let overflow = self.recent_questions.len().saturating_sub(RECENT_QUESTION_LIMIT);
        self.recent_questions.drain(..overflow);
    }

    fn dispatch(&mut self, action: TurnAction) {
        match action {
            TurnAction::RequestQuestion => {
                let questions = Arc::clone(&self.questions);
                let setup = self.machine.setup().clone();
                let recent = self.recent_questions.clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match questions.next_question(&setup, &recent).await {
                        Ok(question) => TurnEvent::QuestionReady { question },
                        Err(e) => TurnEvent::QuestionFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(event).await;
                });
            }
            TurnAction::Speak { text, utterance } => {
                let output = Arc::clone(&self.output);
                let language = self.machine.setup().language;
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let played = match output.speak(&text, language).await {
                        Ok(played) => played,
                        Err(e) => {
                            tracing::warn!(error = %e, "speech synthesis failed");
                            false
                        }
                    };
                    let _ = tx.send(TurnEvent::SpeechFinished { utterance, played }).await;
                });
            }
            TurnAction::CancelSpeech => self.output.cancel(),
            TurnAction::StartRecognition => {
                if let Err(e) = self.input.start() {
                    tracing::warn!(error = %e, "failed to start recognition");
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx
                            .send(TurnEvent::RecognitionFailed {
                                code: "no-device".to_string(),
                            })
                            .await;
                    });
                }
            }
            TurnAction::StopRecognition => self.input.stop(),
            TurnAction::RequestEvaluation { question, answer } => {
                let questions = Arc::clone(&self.questions);
                let setup = self.machine.setup().clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match questions.evaluate(&setup, &question, &answer).await {
                        Ok(evaluation) => TurnEvent::EvaluationReady { evaluation },
                        Err(e) => TurnEvent::EvaluationFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(event).await;
                });
            }
            TurnAction::RequestSampleAnswer { question } => {
                let questions = Arc::clone(&self.questions);
                let setup = self.machine.setup().clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match questions.sample_answer(&setup, &question).await {
                        Ok(answer) => TurnEvent::SampleAnswerReady { answer },
                        Err(e) => TurnEvent::EvaluationFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(event).await;
                });
            }
            TurnAction::ArmTimer { kind, generation } => {
                let duration = self.timer_duration(kind);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = tx.send(TurnEvent::TimerFired { kind, generation }).await;
                });
            }
            TurnAction::Status(status) => {
                tracing::info!(status = %status, "turn status");
                self.last_status = status;
            }
            TurnAction::Toast(message) => {
                tracing::info!(toast = %message, "turn notification");
            }
        }
    }

    fn timer_duration(&self, kind: TimerKind) -> std::time::Duration {
        let options = self.machine.options();
        match kind {
            TimerKind::Hold => options.hold_timeout,
            TimerKind::Decision => options.decision_timeout,
            TimerKind::AutoSubmit => options.auto_submit_timeout,
        }
    }
}
