//! Shared test doubles for the voice session
//!
//! Scripted stand-ins for the speech backend, the microphone, and the
//! speaker sink, so session behavior can be asserted without audio
//! hardware or a running backend.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use clinic_voice::{
    AudioClip, CaptureBackend, Error, PlaybackSink, RecordingState, Result, SpeechBackend,
};

/// One remote call observed by [`ScriptedSpeech`], in dispatch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ClearHistory,
    Synthesize(String),
    /// Upload of a recorded turn, with the uploaded byte length
    Transcribe(usize),
}

/// Speech backend that logs calls and fails on cue
pub struct ScriptedSpeech {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_clear: bool,
    fail_synthesize: bool,
    transcribe_status: Option<u16>,
    reply: Vec<u8>,
}

impl ScriptedSpeech {
    pub fn ok() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_clear: false,
            fail_synthesize: false,
            transcribe_status: None,
            reply: b"REPLY".to_vec(),
        }
    }

    pub fn failing_clear() -> Self {
        Self {
            fail_clear: true,
            ..Self::ok()
        }
    }

    pub fn failing_synthesize() -> Self {
        Self {
            fail_synthesize: true,
            ..Self::ok()
        }
    }

    pub fn failing_transcribe(status: u16) -> Self {
        Self {
            transcribe_status: Some(status),
            ..Self::ok()
        }
    }

    /// Handle onto the call log, usable after the backend moves into a
    /// session
    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SpeechBackend for ScriptedSpeech {
    async fn clear_history(&self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::ClearHistory);
        if self.fail_clear {
            return Err(Error::Remote {
                status: 500,
                detail: "history unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn transcribe_and_respond(&self, clip: AudioClip) -> Result<AudioClip> {
        self.calls.lock().unwrap().push(Call::Transcribe(clip.len()));
        if let Some(status) = self.transcribe_status {
            return Err(Error::Remote {
                status,
                detail: "transcription failed".to_string(),
            });
        }
        Ok(AudioClip::new(self.reply.clone(), "audio/mpeg"))
    }

    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Synthesize(text.to_string()));
        if self.fail_synthesize {
            return Err(Error::Remote {
                status: 502,
                detail: "synthesis unavailable".to_string(),
            });
        }
        Ok(AudioClip::new(b"GREETING".to_vec(), "audio/mpeg"))
    }
}

/// Capture backend that yields pre-scripted audio chunks
pub struct ScriptedCapture {
    chunks: Vec<Vec<u8>>,
    deny_permission: bool,
    state: RecordingState,
}

impl ScriptedCapture {
    /// Capture whose finished clip is the concatenation of `chunks`
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            deny_permission: false,
            state: RecordingState::Idle,
        }
    }

    /// Capture that produces no audio between start and stop
    pub fn empty() -> Self {
        Self::with_chunks(Vec::new())
    }

    /// Capture whose start is refused by the platform
    pub fn denied() -> Self {
        Self {
            deny_permission: true,
            ..Self::empty()
        }
    }
}

#[async_trait(?Send)]
impl CaptureBackend for ScriptedCapture {
    fn start(&mut self) -> Result<()> {
        if self.state == RecordingState::Recording {
            return Err(Error::AlreadyRecording);
        }
        if self.deny_permission {
            return Err(Error::PermissionDenied);
        }
        self.state = RecordingState::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioClip> {
        if self.state == RecordingState::Idle {
            return Err(Error::NotRecording);
        }
        self.state = RecordingState::Idle;

        let bytes = self.chunks.concat();
        if bytes.is_empty() {
            return Err(Error::EmptyRecording);
        }
        Ok(AudioClip::new(bytes, "audio/wav"))
    }

    fn state(&self) -> RecordingState {
        self.state
    }
}

/// One playback attempt observed by [`RecordingSink`]
pub struct PlayEvent {
    pub bytes: Vec<u8>,
    pub started: Instant,
    pub ended: Instant,
}

/// Playback sink that records attempts with timing instead of playing
///
/// A clip whose first byte matches the fail marker is recorded and then
/// reported as a playback failure.
pub struct RecordingSink {
    events: Arc<Mutex<Vec<PlayEvent>>>,
    fail_marker: Option<u8>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            fail_marker: None,
        }
    }

    pub fn with_fail_marker(marker: u8) -> Self {
        Self {
            fail_marker: Some(marker),
            ..Self::new()
        }
    }

    /// Handle onto the event log, usable after the sink moves into a
    /// queue or session
    pub fn events(&self) -> Arc<Mutex<Vec<PlayEvent>>> {
        Arc::clone(&self.events)
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    async fn play(&mut self, clip: &AudioClip) -> Result<()> {
        let started = Instant::now();
        // Give each attempt a measurable duration for overlap checks
        tokio::time::sleep(Duration::from_millis(2)).await;
        let ended = Instant::now();

        self.events.lock().unwrap().push(PlayEvent {
            bytes: clip.bytes().to_vec(),
            started,
            ended,
        });

        if self
            .fail_marker
            .is_some_and(|m| clip.bytes().first() == Some(&m))
        {
            return Err(Error::Playback("scripted failure".to_string()));
        }
        Ok(())
    }
}
