//! End-to-end turn loop tests against mock collaborators
//!
//! These run the real async driver with paused time, scripting what the
//! recognizer "hears" per listening window and asserting which collaborator
//! calls the loop makes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use atlas_studio::question::{Evaluation, InterviewSetup, Language, Level, Track};
use atlas_studio::turn::{
    PauseReason, Phase, QuestionService, SpeechInput, SpeechOutput, TurnDriver, TurnEvent,
    TurnOptions,
};
use atlas_studio::{Error, Result};

fn setup() -> InterviewSetup {
    InterviewSetup {
        role: "Backend Engineer".to_string(),
        track: Track::SystemDesign,
        level: Level::Mid,
        language: Language::En,
        session_id: "sess-test".to_string(),
    }
}

/// Question service with canned responses and call counters
#[derive(Default)]
struct ScriptedQuestions {
    questions: Mutex<VecDeque<String>>,
    next_calls: AtomicUsize,
    eval_calls: AtomicUsize,
    sample_calls: AtomicUsize,
}

impl ScriptedQuestions {
    fn with_questions(questions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            questions: Mutex::new(questions.iter().map(ToString::to_string).collect()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl QuestionService for ScriptedQuestions {
    async fn next_question(&self, _setup: &InterviewSetup, _recent: &[String]) -> Result<String> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        self.questions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Upstream("out of scripted questions".to_string()))
    }

    async fn follow_up(
        &self,
        _setup: &InterviewSetup,
        _question: &str,
        _answer: &str,
    ) -> Result<String> {
        Ok("scripted follow-up?".to_string())
    }

    async fn evaluate(
        &self,
        _setup: &InterviewSetup,
        _question: &str,
        _answer: &str,
    ) -> Result<Evaluation> {
        self.eval_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Evaluation {
            score: 78,
            feedback: "Good structure.".to_string(),
            fallback: false,
        })
    }

    async fn sample_answer(&self, _setup: &InterviewSetup, _question: &str) -> Result<String> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        Ok("Start with context, then tradeoffs.".to_string())
    }
}

/// Recognizer that "hears" one scripted utterance per listening window
struct ScriptedRecognizer {
    events: mpsc::Sender<TurnEvent>,
    utterances: Mutex<VecDeque<Option<String>>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl ScriptedRecognizer {
    fn new(events: mpsc::Sender<TurnEvent>, utterances: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            events,
            utterances: Mutex::new(
                utterances
                    .iter()
                    .map(|u| u.map(ToString::to_string))
                    .collect(),
            ),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }
}

impl SpeechInput for ScriptedRecognizer {
    fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(Some(text)) = self.utterances.lock().unwrap().pop_front() {
            let _ = self.events.try_send(TurnEvent::TranscriptUpdate {
                final_text: text,
                interim_text: String::new(),
            });
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.try_send(TurnEvent::RecognitionEnded);
    }
}

/// Recognizer whose device is unavailable
struct DeadRecognizer;

impl SpeechInput for DeadRecognizer {
    fn start(&self) -> Result<()> {
        Err(Error::Audio("no input device".to_string()))
    }

    fn stop(&self) {}
}

/// Speaker that records utterances and always plays successfully
#[derive(Default)]
struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
}

#[async_trait]
impl SpeechOutput for RecordingSpeaker {
    async fn speak(&self, text: &str, _language: Language) -> Result<bool> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(true)
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[allow(clippy::type_complexity)]
fn build_driver(
    questions: Arc<ScriptedQuestions>,
    utterances: &[Option<&str>],
) -> (
    TurnDriver,
    mpsc::Sender<TurnEvent>,
    Arc<ScriptedRecognizer>,
    Arc<RecordingSpeaker>,
) {
    let (tx, rx) = mpsc::channel(64);
    let recognizer = ScriptedRecognizer::new(tx.clone(), utterances);
    let speaker = Arc::new(RecordingSpeaker::default());
    let (driver, commands) = TurnDriver::from_parts(
        setup(),
        TurnOptions::default(),
        questions,
        Arc::clone(&recognizer) as Arc<dyn SpeechInput>,
        Arc::clone(&speaker) as Arc<dyn SpeechOutput>,
        tx,
        rx,
    );
    (driver, commands, recognizer, speaker)
}

/// The interview-start scenario: one question requested, spoken, and a
/// listening window opened automatically; the answer is auto-submitted after
/// silence, evaluated once, and the spoken "stop" ends the session.
#[tokio::test(start_paused = true)]
async fn full_turn_evaluates_once_and_stops_on_request() {
    let questions = ScriptedQuestions::with_questions(&["How do you shard a database?"]);
    let (driver, _commands, recognizer, speaker) = build_driver(
        Arc::clone(&questions),
        &[
            Some("I would use consistent hashing to spread load"),
            Some("stop"),
        ],
    );

    let machine = driver.run().await;

    assert_eq!(machine.phase(), Phase::Paused);
    assert!(machine.stopped());
    assert_eq!(questions.next_calls.load(Ordering::SeqCst), 1);
    assert_eq!(questions.eval_calls.load(Ordering::SeqCst), 1);
    assert_eq!(questions.sample_calls.load(Ordering::SeqCst), 0);

    let spoken = speaker.spoken.lock().unwrap();
    assert!(spoken[0].contains("How do you shard a database?"));
    assert!(spoken[1].contains("Score 78 out of 100"));
    assert!(spoken[1].contains("say stop now"));

    // The listening window opened at least twice: answer capture and the
    // decision window.
    assert!(recognizer.starts.load(Ordering::SeqCst) >= 2);
}

/// An "I don't know" answer asks for a sample answer, never an evaluation,
/// and the spoken result is followed by a stop/continue window.
#[tokio::test(start_paused = true)]
async fn unknown_answer_gets_sample_answer_then_decision_window() {
    let questions = ScriptedQuestions::with_questions(&["Explain CAP."]);
    let (driver, _commands, _recognizer, speaker) = build_driver(
        Arc::clone(&questions),
        &[Some("I don't know"), Some("stop")],
    );

    let machine = driver.run().await;

    assert!(machine.stopped());
    assert_eq!(questions.sample_calls.load(Ordering::SeqCst), 1);
    assert_eq!(questions.eval_calls.load(Ordering::SeqCst), 0);

    let spoken = speaker.spoken.lock().unwrap();
    assert!(spoken[1].contains("No worries."));
    assert!(spoken[1].contains("Start with context"));
}

/// A mixed Hindi/English "haan, next question" continues to a fresh
/// question.
#[tokio::test(start_paused = true)]
async fn hindi_continue_advances_to_next_question() {
    let questions =
        ScriptedQuestions::with_questions(&["First question?", "Second question?"]);
    let (driver, commands, _recognizer, speaker) = build_driver(
        Arc::clone(&questions),
        &[
            Some("My answer is sharding"),
            Some("haan, next question"),
            // Second listening window hears nothing; the session goes on
            // hold and the shutdown below ends it.
            None,
        ],
    );

    let shutdown = commands.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        let _ = shutdown
            .send(TurnEvent::PauseRequested {
                reason: PauseReason::Requested,
            })
            .await;
    });

    let machine = driver.run().await;

    assert_eq!(machine.phase(), Phase::Paused);
    assert!(!machine.stopped());
    assert_eq!(questions.next_calls.load(Ordering::SeqCst), 2);
    assert_eq!(questions.eval_calls.load(Ordering::SeqCst), 1);

    let spoken = speaker.spoken.lock().unwrap();
    assert!(spoken.iter().any(|s| s.contains("First question?")));
    assert!(spoken.iter().any(|s| s.contains("Second question?")));
}

/// The decision window resolves to "continue" on its own when nothing
/// classifiable is heard.
#[tokio::test(start_paused = true)]
async fn silent_decision_window_defaults_to_continue() {
    let questions = ScriptedQuestions::with_questions(&["Only question?"]);
    let (driver, commands, _recognizer, _speaker) = build_driver(
        Arc::clone(&questions),
        &[Some("some answer"), Some("no worries, thanks"), None],
    );

    let shutdown = commands.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        let _ = shutdown
            .send(TurnEvent::PauseRequested {
                reason: PauseReason::Requested,
            })
            .await;
    });

    let machine = driver.run().await;

    // The filler is not a stop; the timer default asked for a second
    // question, which the script exhausts.
    assert_eq!(questions.next_calls.load(Ordering::SeqCst), 2);
    assert!(!machine.stopped());
}

/// Pausing immediately tears everything down.
#[tokio::test(start_paused = true)]
async fn immediate_pause_quiesces_collaborators() {
    let questions = ScriptedQuestions::with_questions(&["Q?"]);
    let (driver, commands, recognizer, speaker) =
        build_driver(Arc::clone(&questions), &[None]);

    commands
        .send(TurnEvent::PauseRequested {
            reason: PauseReason::Requested,
        })
        .await
        .unwrap();

    let machine = driver.run().await;

    assert_eq!(machine.phase(), Phase::Paused);
    assert!(machine.armed_timers().is_empty());
    assert!(!machine.is_recognizing());
    assert!(recognizer.stops.load(Ordering::SeqCst) >= 1);
    assert!(speaker.cancels.load(Ordering::SeqCst) >= 1);
}

/// A dead microphone degrades gracefully instead of wedging the loop.
#[tokio::test(start_paused = true)]
async fn dead_microphone_disables_auto_voice() {
    let questions = ScriptedQuestions::with_questions(&["Q?"]);
    let (tx, rx) = mpsc::channel(64);
    let speaker = Arc::new(RecordingSpeaker::default());
    let (driver, commands) = TurnDriver::from_parts(
        setup(),
        TurnOptions::default(),
        questions,
        Arc::new(DeadRecognizer) as Arc<dyn SpeechInput>,
        Arc::clone(&speaker) as Arc<dyn SpeechOutput>,
        tx,
        rx,
    );

    let shutdown = commands.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let _ = shutdown
            .send(TurnEvent::PauseRequested {
                reason: PauseReason::Requested,
            })
            .await;
    });

    let machine = driver.run().await;

    assert_eq!(machine.phase(), Phase::Paused);
    assert!(!machine.auto_voice());
}
