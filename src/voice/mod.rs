//! Voice interaction module
//!
//! Handles microphone capture, playback queueing, and the conversation
//! session state machine. Transcription and synthesis are performed by
//! the clinic backend (see `api::speech`).

mod capture;
mod playback;
mod session;

pub use capture::{CaptureBackend, MicCapture, RecordingState, SAMPLE_RATE, samples_to_wav};
pub use playback::{PlaybackQueue, PlaybackSink, SpeakerSink};
pub use session::{SessionState, UiAction, VoiceSession};

/// An immutable audio buffer tagged with its MIME content type
///
/// Produced by the capture session (recorded audio) or by the backend
/// (synthesized audio); consumed once by upload or playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
    content_type: String,
}

impl AudioClip {
    /// Create a clip from raw bytes and a content type
    #[must_use]
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Raw audio bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME content type tag (e.g. `audio/wav`, `audio/mpeg`)
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Byte length of the clip
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the clip holds no audio at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the clip, yielding its bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
