//! The turn-taking state machine
//!
//! A pure transition function over `phase x event`: no I/O, no clocks, no
//! async. Side effects are returned as [`TurnAction`]s for the driver to
//! execute, and everything asynchronous flows back in as a [`TurnEvent`].
//!
//! Late callbacks are absorbed structurally: speech completions carry an
//! utterance id and timer fires carry a generation, both checked against the
//! machine's current values before anything happens.

use super::decision::{Decision, classify_decision, is_unknown_answer};
use super::draft::AnswerDraft;
use super::{PauseReason, TimerKind, TurnFeedback, TurnOptions};
use crate::question::{Evaluation, InterviewSetup, Language};

use std::sync::LazyLock;

use regex::Regex;

static SUBMIT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsubmit\b").expect("valid regex"));

/// Turn phase; exactly one is active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for user action
    Idle,
    /// A question request is in flight
    GeneratingQuestion,
    /// The question is being spoken
    SpeakingQuestion,
    /// Open-ended answer capture
    Listening,
    /// Listening paused after prolonged silence; resume is explicit
    OnHold,
    /// Bounded stop/continue window after feedback
    AwaitingDecision,
    /// An evaluation or sample-answer request is in flight
    Evaluating,
    /// Terminal for the session; all timers and collaborators are quiet
    Paused,
}

/// Everything that can happen to the turn controller
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Start (or restart) the interview loop
    StartRequested,
    /// Question service produced the next question
    QuestionReady { question: String },
    /// Question service failed; the turn reverts to a safe idle
    QuestionFailed { message: String },
    /// Speech output finished (or failed) playing utterance `utterance`
    SpeechFinished { utterance: u64, played: bool },
    /// Streaming recognition update
    TranscriptUpdate {
        final_text: String,
        interim_text: String,
    },
    /// Recognition session ended
    RecognitionEnded,
    /// Recognition failed with a backend error code
    RecognitionFailed { code: String },
    /// Evaluation arrived
    EvaluationReady { evaluation: Evaluation },
    /// Sample answer arrived (the "I don't know" path)
    SampleAnswerReady { answer: String },
    /// Evaluation or sample answer failed
    EvaluationFailed { message: String },
    /// A timer fired; stale generations are ignored
    TimerFired { kind: TimerKind, generation: u64 },
    /// Manual submit button
    SubmitRequested,
    /// Manually typed answer text replacing the draft
    AnswerEdited { text: String },
    /// Manual dictation start
    DictationRequested,
    /// Manual dictation stop
    DictationStopRequested,
    /// Resume listening after hold
    ResumeRequested,
    /// Manual stop/continue button during a decision window
    DecisionRequested { decision: Decision },
    /// Pause the voice loop; safe from every phase
    PauseRequested { reason: PauseReason },
}

/// Side effects for the driver to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    /// Ask the question service for the next question
    RequestQuestion,
    /// Speak text; completion must come back as `SpeechFinished { utterance }`
    Speak { text: String, utterance: u64 },
    /// Preempt any in-flight synthesis or playback
    CancelSpeech,
    /// Open a recognition session
    StartRecognition,
    /// Close the recognition session (no-op if none is active)
    StopRecognition,
    /// Ask for an evaluation of the answer
    RequestEvaluation { question: String, answer: String },
    /// Ask for a sample answer instead of a score
    RequestSampleAnswer { question: String },
    /// Arm a timer; the fire must echo the generation back
    ArmTimer { kind: TimerKind, generation: u64 },
    /// Transient status line
    Status(String),
    /// Timed toast notification
    Toast(String),
}

/// What a question or verdict utterance leads into once spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeakPurpose {
    Question,
    Verdict,
}

/// What to do when the recognition session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    None,
    Submit,
}

#[derive(Debug, Default, Clone, Copy)]
struct Timer {
    armed: bool,
    generation: u64,
}

impl Timer {
    fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.armed = true;
        self.generation
    }

    fn clear(&mut self) {
        if self.armed {
            self.generation += 1;
            self.armed = false;
        }
    }

    const fn accepts(self, generation: u64) -> bool {
        self.armed && self.generation == generation
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Timers {
    hold: Timer,
    decision: Timer,
    auto_submit: Timer,
}

impl Timers {
    fn get_mut(&mut self, kind: TimerKind) -> &mut Timer {
        match kind {
            TimerKind::Hold => &mut self.hold,
            TimerKind::Decision => &mut self.decision,
            TimerKind::AutoSubmit => &mut self.auto_submit,
        }
    }

    fn clear_all(&mut self) {
        self.hold.clear();
        self.decision.clear();
        self.auto_submit.clear();
    }
}

/// The turn-taking state machine
#[derive(Debug)]
pub struct TurnMachine {
    setup: InterviewSetup,
    options: TurnOptions,
    phase: Phase,
    auto_voice: bool,
    draft: AnswerDraft,
    decision_buffer: String,
    current_question: Option<String>,
    last_feedback: Option<TurnFeedback>,
    timers: Timers,
    utterance: u64,
    speaking: Option<SpeakPurpose>,
    continuation: Continuation,
    recognizing: bool,
    stopped: bool,
}

impl TurnMachine {
    /// Create a machine in `Idle`
    #[must_use]
    pub fn new(setup: InterviewSetup, options: TurnOptions) -> Self {
        let auto_voice = options.auto_voice;
        Self {
            setup,
            options,
            phase: Phase::Idle,
            auto_voice,
            draft: AnswerDraft::new(),
            decision_buffer: String::new(),
            current_question: None,
            last_feedback: None,
            timers: Timers::default(),
            utterance: 0,
            speaking: None,
            continuation: Continuation::None,
            recognizing: false,
            stopped: false,
        }
    }

    /// Apply one event and return the side effects to execute
    #[allow(clippy::too_many_lines)]
    pub fn handle(&mut self, event: TurnEvent) -> Vec<TurnAction> {
        match event {
            TurnEvent::StartRequested => self.on_start(),
            TurnEvent::QuestionReady { question } => self.on_question_ready(question),
            TurnEvent::QuestionFailed { message } => self.on_question_failed(&message),
            TurnEvent::SpeechFinished { utterance, played } => {
                self.on_speech_finished(utterance, played)
            }
            TurnEvent::TranscriptUpdate {
                final_text,
                interim_text,
            } => self.on_transcript(&final_text, &interim_text),
            TurnEvent::RecognitionEnded => self.on_recognition_ended(),
            TurnEvent::RecognitionFailed { code } => self.on_recognition_failed(&code),
            TurnEvent::EvaluationReady { evaluation } => self.on_evaluation_ready(evaluation),
            TurnEvent::SampleAnswerReady { answer } => self.on_sample_answer_ready(answer),
            TurnEvent::EvaluationFailed { message } => self.on_evaluation_failed(&message),
            TurnEvent::TimerFired { kind, generation } => self.on_timer(kind, generation),
            TurnEvent::SubmitRequested => self.on_submit_requested(),
            TurnEvent::AnswerEdited { text } => {
                self.draft.set_text(&text);
                Vec::new()
            }
            TurnEvent::DictationRequested => self.on_dictation_requested(),
            TurnEvent::DictationStopRequested => self.on_dictation_stop(),
            TurnEvent::ResumeRequested => self.on_resume(),
            TurnEvent::DecisionRequested { decision } => self.on_manual_decision(decision),
            TurnEvent::PauseRequested { reason } => self.pause(reason),
        }
    }

    // -- event handlers ------------------------------------------------------

    fn on_start(&mut self) -> Vec<TurnAction> {
        if !matches!(self.phase, Phase::Idle | Phase::Paused) {
            return Vec::new();
        }
        self.stopped = false;
        self.auto_voice = self.options.auto_voice;
        self.draft.clear();
        self.decision_buffer.clear();
        self.last_feedback = None;
        self.continuation = Continuation::None;
        self.phase = Phase::GeneratingQuestion;
        vec![
            TurnAction::Status("Generating question...".to_string()),
            TurnAction::Toast("Mock interview started.".to_string()),
            TurnAction::RequestQuestion,
        ]
    }

    fn on_question_ready(&mut self, question: String) -> Vec<TurnAction> {
        if self.phase != Phase::GeneratingQuestion {
            return Vec::new();
        }
        self.current_question = Some(question.clone());
        self.draft.clear();
        self.last_feedback = None;
        self.phase = Phase::SpeakingQuestion;
        self.speaking = Some(SpeakPurpose::Question);
        self.utterance += 1;
        vec![
            TurnAction::Status("Asking question...".to_string()),
            TurnAction::Speak {
                text: spoken_question(self.setup.language, &question),
                utterance: self.utterance,
            },
        ]
    }

    fn on_question_failed(&mut self, message: &str) -> Vec<TurnAction> {
        if self.phase != Phase::GeneratingQuestion {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        vec![
            TurnAction::Status("Next question failed".to_string()),
            TurnAction::Toast(format!("Could not generate a question: {message}")),
        ]
    }

    fn on_speech_finished(&mut self, utterance: u64, played: bool) -> Vec<TurnAction> {
        if utterance != self.utterance {
            // A preempted or superseded utterance; nothing to do.
            return Vec::new();
        }
        let Some(purpose) = self.speaking.take() else {
            return Vec::new();
        };

        match (self.phase, purpose) {
            (Phase::SpeakingQuestion, SpeakPurpose::Question) => {
                if !played {
                    self.phase = Phase::Idle;
                    return vec![
                        TurnAction::Status("Speech failed".to_string()),
                        TurnAction::Toast("Could not play voice.".to_string()),
                    ];
                }
                if self.auto_voice {
                    self.begin_listening("Listening...")
                } else {
                    self.phase = Phase::Idle;
                    vec![TurnAction::Status("Ready for your answer".to_string())]
                }
            }
            (Phase::AwaitingDecision, SpeakPurpose::Verdict) => {
                // The decision window opens once the verdict has been spoken.
                // Arm the timer even when playback failed so the window can
                // never wedge the machine.
                let generation = self.timers.decision.arm();
                let mut actions = Vec::new();
                if played {
                    self.recognizing = true;
                    actions.push(TurnAction::StartRecognition);
                }
                actions.push(TurnAction::ArmTimer {
                    kind: TimerKind::Decision,
                    generation,
                });
                actions.push(TurnAction::Status(
                    "Say stop to end. Otherwise continuing...".to_string(),
                ));
                actions
            }
            _ => Vec::new(),
        }
    }

    fn on_transcript(&mut self, final_text: &str, interim_text: &str) -> Vec<TurnAction> {
        match self.phase {
            Phase::Listening => self.on_answer_transcript(final_text, interim_text),
            Phase::AwaitingDecision => self.on_decision_transcript(final_text, interim_text),
            _ => Vec::new(),
        }
    }

    fn on_answer_transcript(&mut self, final_text: &str, interim_text: &str) -> Vec<TurnAction> {
        let mut actions = Vec::new();
        self.draft.apply(final_text, interim_text);

        if !self.draft.is_empty() {
            let generation = self.timers.hold.arm();
            actions.push(TurnAction::ArmTimer {
                kind: TimerKind::Hold,
                generation,
            });
        }

        let final_trimmed = final_text.trim();
        if !final_trimmed.is_empty() {
            if SUBMIT_KEYWORD.is_match(final_trimmed) {
                self.continuation = Continuation::Submit;
                self.recognizing = false;
                actions.push(TurnAction::StopRecognition);
                actions.push(TurnAction::Status("Submitting...".to_string()));
                return actions;
            }
            if self.auto_voice {
                let generation = self.timers.auto_submit.arm();
                actions.push(TurnAction::ArmTimer {
                    kind: TimerKind::AutoSubmit,
                    generation,
                });
            }
        }
        actions
    }

    fn on_decision_transcript(&mut self, final_text: &str, interim_text: &str) -> Vec<TurnAction> {
        // Decision flow is never blocked by silence logic.
        self.timers.hold.clear();

        let final_trimmed = final_text.trim();
        if !final_trimmed.is_empty() {
            if !self.decision_buffer.is_empty() {
                self.decision_buffer.push(' ');
            }
            self.decision_buffer.push_str(final_trimmed);
        }

        let heard = format!("{} {}", self.decision_buffer, interim_text);
        match classify_decision(&heard, self.options.tie_break) {
            Some(Decision::Continue) => {
                let mut actions = vec![TurnAction::Status(
                    "Heard yes. Loading next question...".to_string(),
                )];
                actions.extend(self.advance_to_next_question());
                actions
            }
            Some(Decision::Stop) => {
                let mut actions = vec![TurnAction::Status("Stopping interview...".to_string())];
                actions.extend(self.pause(PauseReason::Stopped));
                actions
            }
            None => vec![TurnAction::Status(
                "Say stop to end. Otherwise next question will continue.".to_string(),
            )],
        }
    }

    fn on_recognition_ended(&mut self) -> Vec<TurnAction> {
        self.recognizing = false;
        self.timers.hold.clear();
        self.timers.auto_submit.clear();

        if self.continuation == Continuation::Submit {
            self.continuation = Continuation::None;
            return self.submit();
        }

        match self.phase {
            // Recognition backends can terminate unexpectedly; resume
            // transparently while a capture window is supposed to be open.
            Phase::Listening | Phase::AwaitingDecision => {
                self.recognizing = true;
                vec![TurnAction::StartRecognition]
            }
            Phase::Idle => vec![TurnAction::Status("Stopped".to_string())],
            _ => Vec::new(),
        }
    }

    fn on_recognition_failed(&mut self, code: &str) -> Vec<TurnAction> {
        self.recognizing = false;
        self.timers.hold.clear();
        self.timers.auto_submit.clear();

        let mut actions = vec![TurnAction::Status(format!("Speech error: {code}"))];

        if is_device_error(code) {
            // Microphone is gone; degrade to manual text entry.
            self.auto_voice = false;
            actions.push(TurnAction::Toast(
                "Microphone unavailable. Type your answer instead.".to_string(),
            ));
        }
        if self.phase == Phase::Listening {
            self.phase = Phase::Idle;
        }
        // In AwaitingDecision the armed decision timer still resolves the
        // window to its continue default.
        actions
    }

    fn on_evaluation_ready(&mut self, evaluation: Evaluation) -> Vec<TurnAction> {
        if self.phase != Phase::Evaluating {
            return Vec::new();
        }
        let score = evaluation.score;
        let feedback = evaluation.feedback.clone();
        self.last_feedback = Some(TurnFeedback::Evaluated(evaluation));

        let mut actions = vec![
            TurnAction::Status("Submitted".to_string()),
            TurnAction::Toast("Feedback received.".to_string()),
        ];
        if self.auto_voice {
            let spoken = format!(
                "{} {} {}",
                verdict_line(self.setup.language, score),
                feedback,
                decision_line(self.setup.language)
            );
            actions.extend(self.open_decision_window(spoken));
        } else {
            self.phase = Phase::Idle;
        }
        actions
    }

    fn on_sample_answer_ready(&mut self, answer: String) -> Vec<TurnAction> {
        if self.phase != Phase::Evaluating {
            return Vec::new();
        }
        self.last_feedback = Some(TurnFeedback::SampleAnswer(answer.clone()));

        let mut actions = vec![
            TurnAction::Status("Answered".to_string()),
            TurnAction::Toast("Answer ready.".to_string()),
        ];
        if self.auto_voice {
            let spoken = format!(
                "{} {} {}",
                sample_intro(self.setup.language),
                answer,
                decision_line(self.setup.language)
            );
            actions.extend(self.open_decision_window(spoken));
        } else {
            self.phase = Phase::Idle;
        }
        actions
    }

    fn on_evaluation_failed(&mut self, message: &str) -> Vec<TurnAction> {
        if self.phase != Phase::Evaluating {
            return Vec::new();
        }
        // The draft is kept so the answer can be resubmitted.
        self.phase = Phase::Idle;
        vec![
            TurnAction::Status("Submit failed".to_string()),
            TurnAction::Toast(format!("Submit failed: {message}")),
        ]
    }

    fn on_timer(&mut self, kind: TimerKind, generation: u64) -> Vec<TurnAction> {
        if !self.timers.get_mut(kind).accepts(generation) {
            return Vec::new();
        }
        self.timers.get_mut(kind).clear();

        match kind {
            TimerKind::Hold => {
                if self.phase != Phase::Listening {
                    return Vec::new();
                }
                self.phase = Phase::OnHold;
                self.timers.auto_submit.clear();
                self.recognizing = false;
                vec![
                    TurnAction::StopRecognition,
                    TurnAction::Status("On hold. Resume to continue.".to_string()),
                ]
            }
            TimerKind::Decision => {
                if self.phase != Phase::AwaitingDecision {
                    return Vec::new();
                }
                // Absence of a clear stop is consent to continue.
                let mut actions = vec![TurnAction::Status(
                    "Continuing to next question...".to_string(),
                )];
                actions.extend(self.advance_to_next_question());
                actions
            }
            TimerKind::AutoSubmit => {
                if self.phase != Phase::Listening || self.draft.is_empty() {
                    return Vec::new();
                }
                self.continuation = Continuation::Submit;
                self.recognizing = false;
                vec![
                    TurnAction::StopRecognition,
                    TurnAction::Status("Submitting...".to_string()),
                ]
            }
        }
    }

    fn on_submit_requested(&mut self) -> Vec<TurnAction> {
        match self.phase {
            // Single-flight: an evaluation is already in progress.
            Phase::Evaluating => Vec::new(),
            Phase::AwaitingDecision => {
                // A typed "stop" in the answer box is honored; anything else
                // waits for the window to resolve.
                if classify_decision(&self.draft.combined(), self.options.tie_break)
                    == Some(Decision::Stop)
                {
                    self.pause(PauseReason::Stopped)
                } else {
                    vec![TurnAction::Status(
                        "Say stop to end, or wait for the next question.".to_string(),
                    )]
                }
            }
            Phase::Listening => {
                self.continuation = Continuation::Submit;
                self.recognizing = false;
                vec![
                    TurnAction::StopRecognition,
                    TurnAction::Status("Stopping dictation...".to_string()),
                ]
            }
            _ => self.submit(),
        }
    }

    fn on_dictation_requested(&mut self) -> Vec<TurnAction> {
        if !matches!(self.phase, Phase::Idle | Phase::OnHold | Phase::Paused) {
            return Vec::new();
        }
        self.draft.begin_segment();
        self.begin_listening("Listening...")
    }

    fn on_dictation_stop(&mut self) -> Vec<TurnAction> {
        if self.phase != Phase::Listening {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        self.timers.hold.clear();
        self.timers.auto_submit.clear();
        self.recognizing = false;
        vec![
            TurnAction::StopRecognition,
            TurnAction::Status("Stopped".to_string()),
        ]
    }

    fn on_resume(&mut self) -> Vec<TurnAction> {
        if self.phase != Phase::OnHold {
            return Vec::new();
        }
        self.begin_listening("Listening...")
    }

    fn on_manual_decision(&mut self, decision: Decision) -> Vec<TurnAction> {
        if self.phase != Phase::AwaitingDecision {
            return Vec::new();
        }
        match decision {
            Decision::Continue => self.advance_to_next_question(),
            Decision::Stop => self.pause(PauseReason::Stopped),
        }
    }

    // -- shared transitions --------------------------------------------------

    fn begin_listening(&mut self, status: &str) -> Vec<TurnAction> {
        self.phase = Phase::Listening;
        self.recognizing = true;
        let generation = self.timers.hold.arm();
        vec![
            TurnAction::StartRecognition,
            TurnAction::ArmTimer {
                kind: TimerKind::Hold,
                generation,
            },
            TurnAction::Status(status.to_string()),
        ]
    }

    fn open_decision_window(&mut self, spoken: String) -> Vec<TurnAction> {
        self.phase = Phase::AwaitingDecision;
        self.decision_buffer.clear();
        self.timers.clear_all();
        self.speaking = Some(SpeakPurpose::Verdict);
        self.utterance += 1;
        vec![
            TurnAction::Status("Say stop to end. Otherwise continuing...".to_string()),
            TurnAction::Speak {
                text: spoken,
                utterance: self.utterance,
            },
        ]
    }

    fn advance_to_next_question(&mut self) -> Vec<TurnAction> {
        self.decision_buffer.clear();
        self.draft.clear();
        self.timers.clear_all();
        self.continuation = Continuation::None;
        self.phase = Phase::GeneratingQuestion;

        let mut actions = Vec::new();
        if self.recognizing {
            self.recognizing = false;
            actions.push(TurnAction::StopRecognition);
        }
        actions.push(TurnAction::Status("Generating next question...".to_string()));
        actions.push(TurnAction::RequestQuestion);
        actions
    }

    fn submit(&mut self) -> Vec<TurnAction> {
        let answer = self.draft.combined();
        if answer.trim().is_empty() {
            return vec![TurnAction::Toast("Add an answer before submitting.".to_string())];
        }
        let Some(question) = self.current_question.clone() else {
            return vec![TurnAction::Toast("Generate a question first.".to_string())];
        };

        self.timers.auto_submit.clear();
        self.timers.hold.clear();
        self.phase = Phase::Evaluating;

        if is_unknown_answer(&answer) {
            vec![
                TurnAction::Status("Answering...".to_string()),
                TurnAction::RequestSampleAnswer { question },
            ]
        } else {
            vec![
                TurnAction::Status("Submitting...".to_string()),
                TurnAction::RequestEvaluation { question, answer },
            ]
        }
    }

    fn pause(&mut self, reason: PauseReason) -> Vec<TurnAction> {
        self.auto_voice = false;
        self.continuation = Continuation::None;
        self.decision_buffer.clear();
        self.timers.clear_all();
        self.speaking = None;
        self.utterance += 1;
        self.recognizing = false;
        self.phase = Phase::Paused;
        if reason == PauseReason::Stopped {
            self.stopped = true;
        }

        let message = match reason {
            PauseReason::Requested => "Voice loop paused.",
            PauseReason::Stopped => "Interview stopped.",
        };
        vec![
            TurnAction::StopRecognition,
            TurnAction::CancelSpeech,
            TurnAction::Status("Paused".to_string()),
            TurnAction::Toast(message.to_string()),
        ]
    }

    // -- introspection -------------------------------------------------------

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Timers currently armed
    #[must_use]
    pub fn armed_timers(&self) -> Vec<TimerKind> {
        let mut armed = Vec::new();
        if self.timers.hold.armed {
            armed.push(TimerKind::Hold);
        }
        if self.timers.decision.armed {
            armed.push(TimerKind::Decision);
        }
        if self.timers.auto_submit.armed {
            armed.push(TimerKind::AutoSubmit);
        }
        armed
    }

    /// Whether the machine believes a recognition session is open
    #[must_use]
    pub const fn is_recognizing(&self) -> bool {
        self.recognizing
    }

    /// Whether a speech utterance is outstanding
    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }

    /// Whether auto-voice mode is active
    #[must_use]
    pub const fn auto_voice(&self) -> bool {
        self.auto_voice
    }

    /// Whether the session ended through an explicit stop
    #[must_use]
    pub const fn stopped(&self) -> bool {
        self.stopped
    }

    /// The current answer draft text
    #[must_use]
    pub fn answer(&self) -> String {
        self.draft.combined()
    }

    /// The question currently on the table
    #[must_use]
    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    /// The most recent feedback
    #[must_use]
    pub const fn last_feedback(&self) -> Option<&TurnFeedback> {
        self.last_feedback.as_ref()
    }

    /// Interview setup this machine was created with
    #[must_use]
    pub const fn setup(&self) -> &InterviewSetup {
        &self.setup
    }

    /// Controller tuning this machine was created with
    #[must_use]
    pub const fn options(&self) -> &TurnOptions {
        &self.options
    }
}

/// Whether a recognition error code means the microphone path is unusable
fn is_device_error(code: &str) -> bool {
    matches!(
        code,
        "not-allowed" | "service-not-allowed" | "audio-capture" | "no-device"
    )
}

// -- spoken phrasing ---------------------------------------------------------

fn spoken_question(language: Language, question: &str) -> String {
    if language == Language::Hi {
        format!("ठीक है, सवाल सुनिए: {question}")
    } else {
        format!("Alright, here's the question: {question}")
    }
}

fn verdict_line(language: Language, score: u8) -> String {
    if language == Language::En {
        format!("Got it. Score {score} out of 100.")
    } else {
        format!("Theek hai. Score {score} out of 100.")
    }
}

fn decision_line(language: Language) -> &'static str {
    if language == Language::En {
        "If you want to stop, say stop now. Otherwise I will continue with the next question."
    } else {
        "Agar aapko stop karna hai to abhi stop boliye. Warna main next question continue karunga."
    }
}

fn sample_intro(language: Language) -> &'static str {
    if language == Language::En {
        "No worries. Here's a solid answer:"
    } else {
        "Koi baat nahi. Yeh ek solid answer hai:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Level, Track};

    fn machine() -> TurnMachine {
        let setup = InterviewSetup {
            role: "Backend Engineer".to_string(),
            track: Track::SystemDesign,
            level: Level::Mid,
            language: Language::En,
            session_id: "sess-test".to_string(),
        };
        TurnMachine::new(setup, TurnOptions::default())
    }

    fn find_armed(actions: &[TurnAction], kind: TimerKind) -> Option<u64> {
        actions.iter().find_map(|a| match a {
            TurnAction::ArmTimer { kind: k, generation } if *k == kind => Some(*generation),
            _ => None,
        })
    }

    /// Drive a fresh machine to the Listening phase, returning the hold
    /// timer generation.
    fn drive_to_listening(m: &mut TurnMachine) -> u64 {
        m.handle(TurnEvent::StartRequested);
        m.handle(TurnEvent::QuestionReady {
            question: "How do you shard a database?".to_string(),
        });
        let actions = m.handle(TurnEvent::SpeechFinished {
            utterance: 1,
            played: true,
        });
        assert_eq!(m.phase(), Phase::Listening);
        find_armed(&actions, TimerKind::Hold).expect("hold timer armed")
    }

    #[test]
    fn start_requests_first_question() {
        let mut m = machine();
        let actions = m.handle(TurnEvent::StartRequested);
        assert_eq!(m.phase(), Phase::GeneratingQuestion);
        assert!(actions.contains(&TurnAction::RequestQuestion));
    }

    #[test]
    fn question_is_spoken_then_listening_opens() {
        let mut m = machine();
        m.handle(TurnEvent::StartRequested);
        let actions = m.handle(TurnEvent::QuestionReady {
            question: "Q1?".to_string(),
        });
        assert_eq!(m.phase(), Phase::SpeakingQuestion);
        assert!(matches!(actions[1], TurnAction::Speak { .. }));

        let actions = m.handle(TurnEvent::SpeechFinished {
            utterance: 1,
            played: true,
        });
        assert_eq!(m.phase(), Phase::Listening);
        assert!(actions.contains(&TurnAction::StartRecognition));
        assert!(find_armed(&actions, TimerKind::Hold).is_some());
    }

    #[test]
    fn stale_speech_completion_is_ignored() {
        let mut m = machine();
        m.handle(TurnEvent::StartRequested);
        m.handle(TurnEvent::QuestionReady {
            question: "Q1?".to_string(),
        });
        let actions = m.handle(TurnEvent::SpeechFinished {
            utterance: 99,
            played: true,
        });
        assert!(actions.is_empty());
        assert_eq!(m.phase(), Phase::SpeakingQuestion);
    }

    #[test]
    fn hold_timer_moves_listening_to_on_hold_and_back() {
        let mut m = machine();
        let generation = drive_to_listening(&mut m);

        let actions = m.handle(TurnEvent::TimerFired {
            kind: TimerKind::Hold,
            generation,
        });
        assert_eq!(m.phase(), Phase::OnHold);
        assert!(actions.contains(&TurnAction::StopRecognition));
        assert!(m.armed_timers().is_empty());

        let actions = m.handle(TurnEvent::ResumeRequested);
        assert_eq!(m.phase(), Phase::Listening);
        assert!(actions.contains(&TurnAction::StartRecognition));
    }

    #[test]
    fn stale_hold_timer_is_ignored() {
        let mut m = machine();
        let generation = drive_to_listening(&mut m);
        // Speech re-arms the hold timer, invalidating the old generation.
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "some text".to_string(),
            interim_text: String::new(),
        });
        let actions = m.handle(TurnEvent::TimerFired {
            kind: TimerKind::Hold,
            generation,
        });
        assert!(actions.is_empty());
        assert_eq!(m.phase(), Phase::Listening);
    }

    #[test]
    fn spoken_submit_keyword_triggers_submit_on_recognition_end() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "use consistent hashing".to_string(),
            interim_text: String::new(),
        });
        let actions = m.handle(TurnEvent::TranscriptUpdate {
            final_text: "submit".to_string(),
            interim_text: String::new(),
        });
        assert!(actions.contains(&TurnAction::StopRecognition));

        let actions = m.handle(TurnEvent::RecognitionEnded);
        assert_eq!(m.phase(), Phase::Evaluating);
        assert!(matches!(
            actions.last(),
            Some(TurnAction::RequestEvaluation { .. })
        ));
    }

    #[test]
    fn double_submit_is_single_flight() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "an answer".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        let first = m.handle(TurnEvent::RecognitionEnded);
        let requests = first
            .iter()
            .filter(|a| matches!(a, TurnAction::RequestEvaluation { .. }))
            .count();
        assert_eq!(requests, 1);
        assert_eq!(m.phase(), Phase::Evaluating);

        // Second submit while in flight is a no-op.
        let second = m.handle(TurnEvent::SubmitRequested);
        assert!(second.is_empty());
    }

    #[test]
    fn unknown_answer_requests_sample_instead_of_evaluation() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "I don't know".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        let actions = m.handle(TurnEvent::RecognitionEnded);
        assert!(matches!(
            actions.last(),
            Some(TurnAction::RequestSampleAnswer { .. })
        ));
        assert_eq!(m.phase(), Phase::Evaluating);
    }

    #[test]
    fn evaluation_opens_spoken_decision_window() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "my answer".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        m.handle(TurnEvent::RecognitionEnded);

        let actions = m.handle(TurnEvent::EvaluationReady {
            evaluation: Evaluation {
                score: 78,
                feedback: "Good structure.".to_string(),
                fallback: false,
            },
        });
        assert_eq!(m.phase(), Phase::AwaitingDecision);
        let spoken = actions.iter().find_map(|a| match a {
            TurnAction::Speak { text, .. } => Some(text.clone()),
            _ => None,
        });
        let spoken = spoken.expect("verdict spoken");
        assert!(spoken.contains("Score 78 out of 100"));
        assert!(spoken.contains("Good structure."));
        assert!(spoken.contains("say stop now"));
    }

    #[test]
    fn decision_timer_defaults_to_continue() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "answer".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        m.handle(TurnEvent::RecognitionEnded);
        m.handle(TurnEvent::EvaluationReady {
            evaluation: Evaluation {
                score: 50,
                feedback: "ok".to_string(),
                fallback: false,
            },
        });
        let actions = m.handle(TurnEvent::SpeechFinished {
            utterance: 2,
            played: true,
        });
        let generation = find_armed(&actions, TimerKind::Decision).expect("decision timer");

        let actions = m.handle(TurnEvent::TimerFired {
            kind: TimerKind::Decision,
            generation,
        });
        assert_eq!(m.phase(), Phase::GeneratingQuestion);
        assert!(actions.contains(&TurnAction::RequestQuestion));
    }

    #[test]
    fn stop_during_decision_window_pauses() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "answer".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        m.handle(TurnEvent::RecognitionEnded);
        m.handle(TurnEvent::EvaluationReady {
            evaluation: Evaluation {
                score: 50,
                feedback: "ok".to_string(),
                fallback: false,
            },
        });
        m.handle(TurnEvent::SpeechFinished {
            utterance: 2,
            played: true,
        });

        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "stop".to_string(),
            interim_text: String::new(),
        });
        assert_eq!(m.phase(), Phase::Paused);
        assert!(m.stopped());
        assert!(m.armed_timers().is_empty());
        assert!(!m.is_recognizing());
    }

    #[test]
    fn pause_from_every_reachable_phase_leaves_nothing_running() {
        // Build each reachable phase, pause, and assert full quiescence.
        let scenarios: Vec<Box<dyn Fn(&mut TurnMachine)>> = vec![
            Box::new(|_m| {}),
            Box::new(|m| {
                m.handle(TurnEvent::StartRequested);
            }),
            Box::new(|m| {
                m.handle(TurnEvent::StartRequested);
                m.handle(TurnEvent::QuestionReady {
                    question: "Q?".to_string(),
                });
            }),
            Box::new(|m| {
                drive_to_listening(m);
            }),
            Box::new(|m| {
                let generation = drive_to_listening(m);
                m.handle(TurnEvent::TimerFired {
                    kind: TimerKind::Hold,
                    generation,
                });
            }),
            Box::new(|m| {
                drive_to_listening(m);
                m.handle(TurnEvent::TranscriptUpdate {
                    final_text: "answer".to_string(),
                    interim_text: String::new(),
                });
                m.handle(TurnEvent::SubmitRequested);
                m.handle(TurnEvent::RecognitionEnded);
            }),
            Box::new(|m| {
                drive_to_listening(m);
                m.handle(TurnEvent::TranscriptUpdate {
                    final_text: "answer".to_string(),
                    interim_text: String::new(),
                });
                m.handle(TurnEvent::SubmitRequested);
                m.handle(TurnEvent::RecognitionEnded);
                m.handle(TurnEvent::EvaluationReady {
                    evaluation: Evaluation {
                        score: 70,
                        feedback: "fine".to_string(),
                        fallback: false,
                    },
                });
                m.handle(TurnEvent::SpeechFinished {
                    utterance: 2,
                    played: true,
                });
            }),
        ];

        for (idx, build) in scenarios.iter().enumerate() {
            let mut m = machine();
            build(&mut m);
            let actions = m.handle(TurnEvent::PauseRequested {
                reason: PauseReason::Requested,
            });
            assert_eq!(m.phase(), Phase::Paused, "scenario {idx}");
            assert!(m.armed_timers().is_empty(), "scenario {idx}: timers armed");
            assert!(!m.is_recognizing(), "scenario {idx}: recognition active");
            assert!(!m.is_speaking(), "scenario {idx}: speech outstanding");
            assert!(actions.contains(&TurnAction::StopRecognition), "scenario {idx}");
            assert!(actions.contains(&TurnAction::CancelSpeech), "scenario {idx}");
        }
    }

    #[test]
    fn pause_is_idempotent() {
        let mut m = machine();
        m.handle(TurnEvent::PauseRequested {
            reason: PauseReason::Requested,
        });
        let actions = m.handle(TurnEvent::PauseRequested {
            reason: PauseReason::Requested,
        });
        assert_eq!(m.phase(), Phase::Paused);
        assert!(actions.contains(&TurnAction::StopRecognition));
    }

    #[test]
    fn late_callbacks_after_pause_are_no_ops() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::PauseRequested {
            reason: PauseReason::Requested,
        });

        assert!(m
            .handle(TurnEvent::SpeechFinished {
                utterance: 1,
                played: true
            })
            .is_empty());
        assert!(m
            .handle(TurnEvent::TimerFired {
                kind: TimerKind::Hold,
                generation: 1
            })
            .is_empty());
        assert!(m
            .handle(TurnEvent::TranscriptUpdate {
                final_text: "late".to_string(),
                interim_text: String::new()
            })
            .is_empty());
        assert_eq!(m.phase(), Phase::Paused);
    }

    #[test]
    fn unexpected_recognition_end_restarts_listening() {
        let mut m = machine();
        drive_to_listening(&mut m);
        let actions = m.handle(TurnEvent::RecognitionEnded);
        assert_eq!(m.phase(), Phase::Listening);
        assert!(actions.contains(&TurnAction::StartRecognition));
    }

    #[test]
    fn manual_dictation_stop_does_not_restart() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::DictationStopRequested);
        assert_eq!(m.phase(), Phase::Idle);
        let actions = m.handle(TurnEvent::RecognitionEnded);
        assert!(!actions.contains(&TurnAction::StartRecognition));
    }

    #[test]
    fn auto_submit_fires_only_with_content() {
        let mut m = machine();
        drive_to_listening(&mut m);

        let actions = m.handle(TurnEvent::TranscriptUpdate {
            final_text: "partial answer".to_string(),
            interim_text: String::new(),
        });
        let generation = find_armed(&actions, TimerKind::AutoSubmit).expect("auto-submit armed");

        let actions = m.handle(TurnEvent::TimerFired {
            kind: TimerKind::AutoSubmit,
            generation,
        });
        assert!(actions.contains(&TurnAction::StopRecognition));
        let actions = m.handle(TurnEvent::RecognitionEnded);
        assert!(matches!(
            actions.last(),
            Some(TurnAction::RequestEvaluation { .. })
        ));
    }

    #[test]
    fn question_failure_reverts_to_idle() {
        let mut m = machine();
        m.handle(TurnEvent::StartRequested);
        let actions = m.handle(TurnEvent::QuestionFailed {
            message: "rate limited".to_string(),
        });
        assert_eq!(m.phase(), Phase::Idle);
        assert!(actions
            .iter()
            .any(|a| matches!(a, TurnAction::Toast(msg) if msg.contains("rate limited"))));
    }

    #[test]
    fn evaluation_failure_keeps_draft_for_retry() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::TranscriptUpdate {
            final_text: "my answer".to_string(),
            interim_text: String::new(),
        });
        m.handle(TurnEvent::SubmitRequested);
        m.handle(TurnEvent::RecognitionEnded);
        m.handle(TurnEvent::EvaluationFailed {
            message: "timeout".to_string(),
        });
        assert_eq!(m.phase(), Phase::Idle);
        assert_eq!(m.answer(), "my answer");
    }

    #[test]
    fn device_error_disables_auto_voice() {
        let mut m = machine();
        drive_to_listening(&mut m);
        m.handle(TurnEvent::RecognitionFailed {
            code: "not-allowed".to_string(),
        });
        assert!(!m.auto_voice());
        assert_eq!(m.phase(), Phase::Idle);
    }

    #[test]
    fn empty_draft_submit_is_rejected_with_toast() {
        let mut m = machine();
        m.handle(TurnEvent::StartRequested);
        m.handle(TurnEvent::QuestionReady {
            question: "Q?".to_string(),
        });
        m.handle(TurnEvent::SpeechFinished {
            utterance: 1,
            played: true,
        });
        m.handle(TurnEvent::DictationStopRequested);
        let actions = m.handle(TurnEvent::SubmitRequested);
        assert!(actions
            .iter()
            .any(|a| matches!(a, TurnAction::Toast(msg) if msg.contains("Add an answer"))));
        assert_eq!(m.phase(), Phase::Idle);
    }
}
