//! Live speech recognition over microphone capture
//!
//! Implements the turn controller's speech-input contract: `start` opens a
//! capture thread that segments the microphone stream into utterances and
//! transcribes each one, emitting transcript updates into the turn event
//! channel; `stop` tears the session down and emits the end event. Stopping
//! an idle recognizer is a no-op.
//!
//! Batch transcription yields finalized segments only; interim text is left
//! empty and the contract carries it for streaming backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use super::capture::{MicStream, SAMPLE_RATE, samples_to_wav};
use super::segmenter::UtteranceSegmenter;
use super::stt::SpeechTranscriber;
use crate::question::Language;
use crate::turn::{SpeechInput, TurnEvent};
use crate::{Error, Result};

/// How long the capture thread waits for a chunk before checking the stop flag
const CHUNK_WAIT: Duration = Duration::from_millis(100);

/// Live recognizer bridging microphone capture to the turn event channel
pub struct LiveRecognizer {
    events: mpsc::Sender<TurnEvent>,
    transcriber: Arc<SpeechTranscriber>,
    language: Language,
    running: Arc<AtomicBool>,
    session: AtomicU64,
    runtime: tokio::runtime::Handle,
}

impl LiveRecognizer {
    /// Create a recognizer that emits into `events`
    #[must_use]
    pub fn new(
        events: mpsc::Sender<TurnEvent>,
        transcriber: Arc<SpeechTranscriber>,
        language: Language,
    ) -> Self {
        Self {
            events,
            transcriber,
            language,
            running: Arc::new(AtomicBool::new(false)),
            session: AtomicU64::new(0),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    fn spawn_capture_thread(&self, session: u64) {
        let events = self.events.clone();
        let transcriber = Arc::clone(&self.transcriber);
        let language = self.language;
        let running = Arc::clone(&self.running);
        let runtime = self.runtime.clone();

        std::thread::Builder::new()
            .name(format!("recognizer-{session}"))
            .spawn(move || {
                capture_loop(&events, &transcriber, language, &running, &runtime);
            })
            .map_err(|e| {
                tracing::error!(error = %e, "failed to spawn capture thread");
            })
            .ok();
    }
}

impl SpeechInput for LiveRecognizer {
    fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            // Already capturing; the existing session keeps emitting.
            return Ok(());
        }
        // Probe the device up front so permission problems surface as a
        // start error rather than a dead capture thread.
        MicStream::open().map(drop).map_err(|e| {
            self.running.store(false, Ordering::SeqCst);
            Error::Audio(format!("microphone unavailable: {e}"))
        })?;

        let session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.spawn_capture_thread(session);
        Ok(())
    }

    fn stop(&self) {
        // No-op when idle, including before any result has arrived.
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Blocking capture loop; owns the cpal stream (not `Send`) for its lifetime
fn capture_loop(
    events: &mpsc::Sender<TurnEvent>,
    transcriber: &Arc<SpeechTranscriber>,
    language: Language,
    running: &Arc<AtomicBool>,
    runtime: &tokio::runtime::Handle,
) {
    let mic = match MicStream::open() {
        Ok(mic) => mic,
        Err(e) => {
            tracing::error!(error = %e, "capture thread could not open microphone");
            running.store(false, Ordering::SeqCst);
            let _ = events.blocking_send(TurnEvent::RecognitionFailed {
                code: "audio-capture".to_string(),
            });
            return;
        }
    };

    let mut segmenter = UtteranceSegmenter::default();
    while running.load(Ordering::SeqCst) {
        let Some(chunk) = mic.read_chunk(CHUNK_WAIT) else {
            continue;
        };
        if let Some(utterance) = segmenter.push(&chunk) {
            transcribe_and_emit(events, transcriber, language, utterance, runtime);
        }
    }

    // Whatever was mid-utterance when the session closed still counts.
    if let Some(utterance) = segmenter.flush() {
        transcribe_and_emit(events, transcriber, language, utterance, runtime);
    }

    let _ = events.blocking_send(TurnEvent::RecognitionEnded);
    tracing::debug!("recognition session ended");
}

fn transcribe_and_emit(
    events: &mpsc::Sender<TurnEvent>,
    transcriber: &Arc<SpeechTranscriber>,
    language: Language,
    utterance: Vec<f32>,
    runtime: &tokio::runtime::Handle,
) {
    let wav = match samples_to_wav(&utterance, SAMPLE_RATE) {
        Ok(wav) => wav,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode utterance");
            return;
        }
    };

    let transcriber = Arc::clone(transcriber);
    let result = runtime.block_on(async move {
        transcriber
            .transcribe(wav, "utterance.wav", "audio/wav", language)
            .await
    });

    match result {
        Ok(text) if !text.is_empty() => {
            tracing::debug!(transcript = %text, "utterance transcribed");
            let _ = events.blocking_send(TurnEvent::TranscriptUpdate {
                final_text: text,
                interim_text: String::new(),
            });
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed");
        }
    }
}
