//! Audio playback to speakers
//!
//! Clips wait in a FIFO queue and play one at a time, each to its
//! natural end. A clip that fails to play is logged and skipped; the
//! queue advances to the next entry.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::voice::AudioClip;
use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Playback seam: play one clip to completion
#[async_trait]
pub trait PlaybackSink {
    /// Play a clip to its natural end
    ///
    /// # Errors
    ///
    /// Returns `Playback` if the clip cannot be decoded or the output
    /// stream fails.
    async fn play(&mut self, clip: &AudioClip) -> Result<()>;
}

/// FIFO queue of clips awaiting playback
///
/// At most one clip is playing at any time; enqueueing never preempts
/// an in-flight clip.
pub struct PlaybackQueue<S> {
    sink: S,
    pending: VecDeque<AudioClip>,
    playing: bool,
}

impl<S: PlaybackSink> PlaybackQueue<S> {
    /// Create an empty queue over a sink
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            pending: VecDeque::new(),
            playing: false,
        }
    }

    /// Append a clip; when nothing is playing, drain the queue in FIFO
    /// order. Returns the number of clips whose playback failed —
    /// failures do not block later entries.
    pub async fn enqueue(&mut self, clip: AudioClip) -> usize {
        self.pending.push_back(clip);
        if self.playing {
            return 0;
        }
        self.drain().await
    }

    /// Play queued clips until the queue is empty
    async fn drain(&mut self) -> usize {
        self.playing = true;
        let mut failed = 0;

        while let Some(clip) = self.pending.pop_front() {
            tracing::debug!(
                bytes = clip.len(),
                content_type = clip.content_type(),
                "playing clip"
            );
            if let Err(e) = self.sink.play(&clip).await {
                tracing::warn!(error = %e, "playback failed, skipping clip");
                failed += 1;
            }
            // clip dropped here, releasing its buffer
        }

        self.playing = false;
        failed
    }

    /// Whether the queue is empty and nothing is playing
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.playing && self.pending.is_empty()
    }
}

/// Plays clips through the default output device
pub struct SpeakerSink {
    config: StreamConfig,
}

impl SpeakerSink {
    /// Create a playback sink on the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device or config is available
    pub fn new() -> Result<Self> {
        let (device, config) = output_device()?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play raw f32 samples to their natural end, blocking until done
    ///
    /// # Errors
    ///
    /// Returns `Playback` if the output stream fails
    pub fn play_samples(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;

        let sample_count = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(Mutex::new(0_usize));
        let finished = Arc::new(Mutex::new(false));

        let samples_cb = Arc::clone(&samples);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pos) = position_cb.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples_cb.len() {
                            samples_cb[*pos]
                        } else {
                            if let Ok(mut done) = finished_cb.lock() {
                                *done = true;
                            }
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples_cb.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Playback(e.to_string()))?;

        stream.play().map_err(|e| Error::Playback(e.to_string()))?;

        // Wait for natural end, bounded by the clip duration plus slack
        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(duration_ms + 500);

        while !finished.lock().map(|done| *done).unwrap_or(true) {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Let the device flush its last buffer
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

#[async_trait]
impl PlaybackSink for SpeakerSink {
    async fn play(&mut self, clip: &AudioClip) -> Result<()> {
        let samples = decode_clip(clip)?;
        self.play_samples(samples)
    }
}

/// Find the default output device with a usable config
fn output_device() -> Result<(Device, StreamConfig)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();

    Ok((device, config))
}

/// Decode a clip to mono f32 samples based on its content type
fn decode_clip(clip: &AudioClip) -> Result<Vec<f32>> {
    let content_type = clip.content_type().to_ascii_lowercase();

    if content_type.contains("wav") {
        decode_wav(clip.bytes())
    } else if content_type.contains("mpeg") || content_type.contains("mp3") {
        decode_mp3(clip.bytes())
    } else {
        // The backend tags are not guaranteed; try both decoders
        decode_mp3(clip.bytes()).or_else(|_| decode_wav(clip.bytes()))
    }
}

/// Decode WAV bytes to f32 samples
fn decode_wav(data: &[u8]) -> Result<Vec<f32>> {
    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Playback(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(e.to_string()))?,
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(e.to_string()))?,
    };

    Ok(downmix(&samples, usize::from(spec.channels)))
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let mono: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(mono);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Playback("no decodable audio frames".to_string()));
    }

    Ok(samples)
}

/// Average interleaved channels down to mono
#[allow(clippy::cast_precision_loss)]
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
