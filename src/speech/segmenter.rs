//! Energy-based utterance segmentation
//!
//! Splits a continuous microphone stream into utterances: capture begins
//! when chunk energy crosses the speech threshold and the utterance
//! completes after sustained trailing silence. Batch transcription runs per
//! completed utterance.

use super::capture::SAMPLE_RATE;

/// Default RMS energy above which a chunk counts as speech
const SPEECH_RMS_THRESHOLD: f32 = 0.015;

/// Trailing silence that completes an utterance
const SILENCE_TO_COMPLETE_SECS: f32 = 0.6;

/// Utterances shorter than this are discarded as noise
const MIN_UTTERANCE_SECS: f32 = 0.3;

/// Hard cap on a single utterance
const MAX_UTTERANCE_SECS: f32 = 30.0;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    /// Waiting for speech energy
    Waiting,
    /// Accumulating an utterance
    Capturing,
}

/// Splits audio chunks into complete utterances
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    silent_samples: usize,
    threshold: f32,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new(SPEECH_RMS_THRESHOLD)
    }
}

impl UtteranceSegmenter {
    /// Create a segmenter with a custom speech threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self {
            state: SegmenterState::Waiting,
            buffer: Vec::new(),
            silent_samples: 0,
            threshold,
        }
    }

    /// Feed one chunk; returns a completed utterance when one closed
    pub fn push(&mut self, chunk: &[f32]) -> Option<Vec<f32>> {
        if chunk.is_empty() {
            return None;
        }
        let speechy = rms(chunk) >= self.threshold;

        match self.state {
            SegmenterState::Waiting => {
                if speechy {
                    self.state = SegmenterState::Capturing;
                    self.buffer.extend_from_slice(chunk);
                    self.silent_samples = 0;
                }
                None
            }
            SegmenterState::Capturing => {
                self.buffer.extend_from_slice(chunk);
                if speechy {
                    self.silent_samples = 0;
                } else {
                    self.silent_samples += chunk.len();
                }

                let silence_needed = seconds_to_samples(SILENCE_TO_COMPLETE_SECS);
                let too_long = self.buffer.len() >= seconds_to_samples(MAX_UTTERANCE_SECS);
                if self.silent_samples >= silence_needed || too_long {
                    return self.finish();
                }
                None
            }
        }
    }

    /// Close and return any in-flight utterance (used on teardown)
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.state == SegmenterState::Capturing {
            self.finish()
        } else {
            None
        }
    }

    /// Whether an utterance is currently being captured
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state == SegmenterState::Capturing
    }

    fn finish(&mut self) -> Option<Vec<f32>> {
        // Trailing silence is part of the buffer but not of the speech.
        let speech_len = self.buffer.len().saturating_sub(self.silent_samples);
        self.state = SegmenterState::Waiting;
        self.silent_samples = 0;
        let utterance = std::mem::take(&mut self.buffer);
        if speech_len >= seconds_to_samples(MIN_UTTERANCE_SECS) {
            Some(utterance)
        } else {
            None
        }
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    #[allow(clippy::cast_precision_loss)]
    {
        (sum_squares / samples.len() as f32).sqrt()
    }
}

fn seconds_to_samples(secs: f32) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (secs * SAMPLE_RATE as f32) as usize
    }
}
