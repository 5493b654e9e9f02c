//! Speech processing
//!
//! HTTP clients for the hosted speech service (synthesis and batch
//! transcription) plus the local audio plumbing: microphone capture,
//! playback, utterance segmentation, and the live recognizer that implements
//! the turn controller's speech-input contract.

mod capture;
mod playback;
mod recognizer;
mod segmenter;
mod stt;
mod tts;

pub use capture::{MicStream, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayer;
pub use recognizer::LiveRecognizer;
pub use segmenter::UtteranceSegmenter;
pub use stt::{SpeechTranscriber, SttConfig};
pub use tts::{SpeechSynthesizer, SynthesizedAudio, TtsConfig, VoiceSpeaker, humanize_speech_text};

use crate::question::Language;

/// Speech service language code for an assistant language
#[must_use]
pub const fn service_language_code(language: Language) -> &'static str {
    match language {
        Language::Hi | Language::Hinglish => "hi-IN",
        Language::En => "en-IN",
    }
}
