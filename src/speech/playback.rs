//! Audio playback to speakers
//!
//! Playback is cancelable: `stop` bumps an epoch that the playback wait loop
//! checks, so a new utterance (or a pause) preempts whatever is playing.
//! Streams are built on a blocking thread because cpal streams are not
//! `Send`.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::{Error, Result};

/// Plays decoded audio to the default output device
pub struct AudioPlayer {
    epoch: Arc<AtomicU64>,
}

impl AudioPlayer {
    /// Create a player, verifying an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        host.default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;
        Ok(Self {
            epoch: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Stop whatever is currently playing
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Decode and play an encoded audio blob to completion
    ///
    /// Returns early (without error) when preempted by [`Self::stop`].
    ///
    /// # Errors
    ///
    /// Returns error on decode failure or device errors
    pub async fn play_encoded(&self, bytes: &[u8], format: &str) -> Result<()> {
        let (samples, sample_rate) = match format.trim().to_lowercase().as_str() {
            "mp3" => decode_mp3(bytes)?,
            "wav" => decode_wav(bytes)?,
            other => return Err(Error::Audio(format!("unsupported audio format: {other}"))),
        };
        self.play_samples(samples, sample_rate).await
    }

    /// Play raw mono samples to completion
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built
    pub async fn play_samples(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let my_epoch = self.epoch.load(Ordering::SeqCst);
        let epoch = Arc::clone(&self.epoch);

        tokio::task::spawn_blocking(move || play_blocking(&samples, sample_rate, &epoch, my_epoch))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Build an output stream on this thread and block until the samples finish
/// or the epoch moves on.
fn play_blocking(
    samples: &[f32],
    sample_rate: u32,
    epoch: &Arc<AtomicU64>,
    my_epoch: u64,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            (c.channels() == 1 || c.channels() == 2)
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;
    let config = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;

    let queue = Arc::new(Mutex::new((samples.to_vec(), 0usize)));
    let queue_cb = Arc::clone(&queue);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut guard) = queue_cb.lock() else {
                    data.fill(0.0);
                    return;
                };
                let (samples, pos) = &mut *guard;
                for frame in data.chunks_mut(channels) {
                    let value = samples.get(*pos).copied().unwrap_or(0.0);
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                    if *pos < samples.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;
    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let total = queue.lock().map(|g| g.0.len()).unwrap_or_default();
    let duration_ms = (total as u64).saturating_mul(1000) / u64::from(sample_rate.max(1));
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(duration_ms + 500);

    loop {
        if epoch.load(Ordering::SeqCst) != my_epoch {
            tracing::debug!("playback preempted");
            break;
        }
        let done = queue.lock().map(|g| g.1 >= g.0.len()).unwrap_or(true);
        if done || std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    drop(stream);
    Ok(())
}

/// Decode MP3 bytes into mono f32 samples plus the stream sample rate
fn decode_mp3(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate.max(0) as u32;
                }
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Audio("MP3 stream contained no audio".to_string()));
    }
    Ok((samples, sample_rate))
}

/// Decode WAV bytes into mono f32 samples plus the sample rate
fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .filter_map(std::result::Result::ok)
            .map(|s| f32::from(s) / 32768.0)
            .collect(),
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .filter_map(std::result::Result::ok)
            .collect(),
    };

    let mono = if spec.channels == 2 {
        samples
            .chunks(2)
            .map(|pair| f32::midpoint(pair[0], pair.get(1).copied().unwrap_or(pair[0])))
            .collect()
    } else {
        samples
    };

    if mono.is_empty() {
        return Err(Error::Audio("WAV stream contained no audio".to_string()));
    }
    Ok((mono, spec.sample_rate))
}
