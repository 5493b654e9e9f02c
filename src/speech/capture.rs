//! Microphone capture
//!
//! A pull-based stream of audio chunks from the default input device. The
//! cpal stream is not `Send`, so a [`MicStream`] lives entirely on the
//! capture thread that opened it; consumers pull chunks with a timeout.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};

use crate::{Error, Result};

/// Capture sample rate (16 kHz mono, the common speech rate)
pub const SAMPLE_RATE: u32 = 16000;

/// An open microphone stream delivering f32 sample chunks
pub struct MicStream {
    // Held so capture keeps running; dropped to stop.
    _stream: Stream,
    chunks: mpsc::Receiver<Vec<f32>>,
}

impl MicStream {
    /// Open the default input device at the capture rate
    ///
    /// # Errors
    ///
    /// Returns error if no input device or suitable config is available
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;
        let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

        let (tx, chunks) = mpsc::channel::<Vec<f32>>();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Receiver may be gone during teardown; ignore.
                    let _ = tx.send(data.to_vec());
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone capture started"
        );

        Ok(Self {
            _stream: stream,
            chunks,
        })
    }

    /// Pull the next chunk, waiting up to `timeout`
    ///
    /// Returns `None` when no audio arrived in time.
    #[must_use]
    pub fn read_chunk(&self, timeout: Duration) -> Option<Vec<f32>> {
        self.chunks.recv_timeout(timeout).ok()
    }
}

/// Encode f32 samples as 16-bit mono WAV bytes for the STT API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}
