//! Microphone capture
//!
//! One capture session produces exactly one finished clip per
//! start/stop cycle. The input stream is built fresh on every start and
//! torn down on stop, so the microphone is held only while recording.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::voice::AudioClip;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Capture state of a microphone session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No stream is live; the microphone is released
    Idle,
    /// A stream is live and buffering chunks
    Recording,
}

/// Capture seam for the session controller
///
/// Implementations buffer incoming audio chunks in arrival order
/// between `start` and `stop` and finalize them into a single clip.
/// `?Send` because real cpal streams are not `Send`; the session runs
/// on the main task.
#[async_trait(?Send)]
pub trait CaptureBackend {
    /// Begin a new capture cycle, acquiring the microphone
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRecording` if a capture is live,
    /// `DeviceUnavailable` if no input device exists, or
    /// `PermissionDenied` if the platform refuses access.
    fn start(&mut self) -> Result<()>;

    /// Finish the capture cycle and return the finalized clip
    ///
    /// Releases the microphone before finalization, so the device is
    /// free again even if encoding fails.
    ///
    /// # Errors
    ///
    /// Returns `NotRecording` if no capture is live, or
    /// `EmptyRecording` if no audio arrived between start and stop.
    async fn stop(&mut self) -> Result<AudioClip>;

    /// Current capture state
    fn state(&self) -> RecordingState;
}

/// Captures audio from the default input device
pub struct MicCapture {
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl MicCapture {
    /// Create an idle capture session
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        }
    }

    /// RMS level of the audio buffered so far (for level meters)
    #[must_use]
    pub fn level(&self) -> f32 {
        self.buffer.lock().map_or(0.0, |buf| rms(&buf))
    }

    /// Number of samples buffered so far
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.lock().map_or(0, |buf| buf.len())
    }
}

#[async_trait(?Send)]
impl CaptureBackend for MicCapture {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyRecording);
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(map_config_error)?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable("no suitable input config found".to_string())
            })?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "opening capture stream"
        );

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        let buffer = Arc::clone(&self.buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Chunks append in arrival order; never reordered
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(map_build_error)?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("recording started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioClip> {
        let Some(stream) = self.stream.take() else {
            return Err(Error::NotRecording);
        };

        // Dropping the stream releases the microphone device
        drop(stream);

        let samples = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        tracing::debug!(samples = samples.len(), "recording stopped");

        if samples.is_empty() {
            return Err(Error::EmptyRecording);
        }

        // WAV encoding of a long take is not instantaneous
        let wav = tokio::task::spawn_blocking(move || samples_to_wav(&samples, SAMPLE_RATE))
            .await
            .map_err(|e| Error::Audio(e.to_string()))??;

        Ok(AudioClip::new(wav, "audio/wav"))
    }

    fn state(&self) -> RecordingState {
        if self.stream.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }
}

/// Map a stream-build failure onto the capture error taxonomy
fn map_build_error(e: cpal::BuildStreamError) -> Error {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            Error::DeviceUnavailable("input device disappeared".to_string())
        }
        other => {
            let msg = other.to_string();
            if msg.to_ascii_lowercase().contains("permission") {
                Error::PermissionDenied
            } else {
                Error::Audio(msg)
            }
        }
    }
}

fn map_config_error(e: cpal::SupportedStreamConfigsError) -> Error {
    match e {
        cpal::SupportedStreamConfigsError::DeviceNotAvailable => {
            Error::DeviceUnavailable("input device disappeared".to_string())
        }
        other => Error::Audio(other.to_string()),
    }
}

/// RMS energy of a sample buffer
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert f32 samples to WAV bytes for upload
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
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WAV header is a fixed 44 bytes for PCM mono
    const WAV_HEADER_LEN: usize = 44;

    #[test]
    fn wav_has_riff_header() {
        let samples = vec![0.0_f32; 160];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }

    #[test]
    fn clip_length_is_sum_of_chunks() {
        // Chunks buffered in arrival order concatenate without loss
        let chunks: [&[f32]; 3] = [&[0.1, 0.2], &[0.3], &[0.4, 0.5, 0.6]];
        let mut buffer = Vec::new();
        for chunk in chunks {
            buffer.extend_from_slice(chunk);
        }

        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(buffer.len(), total);

        // Each i16 sample is two bytes in the encoded clip
        let wav = samples_to_wav(&buffer, SAMPLE_RATE).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN + total * 2);
    }

    #[test]
    fn wav_roundtrip_preserves_sample_count() {
        let original: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
        let wav = samples_to_wav(&original, SAMPLE_RATE).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.channels, 1);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read.len(), original.len());
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0.0; 64]), 0.0);
    }
}
