//! Conversation session state machine
//!
//! Orchestrates one spoken conversation: reset remote history, play the
//! greeting, then alternate record → transcribe → play reply turns.
//! Every failure is recovered here; the session never ends up stuck in
//! `Recording`.

use crate::api::SpeechBackend;
use crate::voice::{AudioClip, CaptureBackend, PlaybackQueue, PlaybackSink};
use crate::{Error, Result};

/// Phase of the conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session has not been started yet
    NotStarted,
    /// Ready to record the next user turn
    Idle,
    /// Microphone is live
    Recording,
}

/// The single UI affordance valid for the current state
///
/// Exactly one of these is derivable at any time; stale triggers for
/// any other affordance are rejected, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    /// Begin the conversation session
    Start,
    /// Begin recording a user turn
    StartRecording,
    /// Finish recording and send the turn
    StopRecording,
}

/// Drives capture, the speech backend, and playback for one session
pub struct VoiceSession<A, C, S> {
    speech: A,
    capture: C,
    queue: PlaybackQueue<S>,
    state: SessionState,
    greeting: String,
}

impl<A, C, S> VoiceSession<A, C, S>
where
    A: SpeechBackend,
    C: CaptureBackend,
    S: PlaybackSink,
{
    /// Create a session in the `NotStarted` state
    #[must_use]
    pub fn new(speech: A, capture: C, sink: S, greeting: impl Into<String>) -> Self {
        Self {
            speech,
            capture,
            queue: PlaybackQueue::new(sink),
            state: SessionState::NotStarted,
            greeting: greeting.into(),
        }
    }

    /// Current session state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The one affordance the UI should offer right now
    #[must_use]
    pub const fn ui_action(&self) -> UiAction {
        match self.state {
            SessionState::NotStarted => UiAction::Start,
            SessionState::Idle => UiAction::StartRecording,
            SessionState::Recording => UiAction::StopRecording,
        }
    }

    /// Start the conversation: reset remote history, then synthesize
    /// and play the greeting
    ///
    /// History reset completes (success or failure observed) before the
    /// greeting request is issued. If either remote call fails the
    /// session stays `NotStarted` and the user may start again.
    ///
    /// # Errors
    ///
    /// Returns `SessionStarted` if already started, or the remote
    /// failure that aborted the transition.
    pub async fn start_session(&mut self) -> Result<()> {
        if self.state != SessionState::NotStarted {
            return Err(Error::SessionStarted);
        }

        self.speech.clear_history().await?;
        tracing::debug!("conversation history cleared");

        let greeting = self.speech.synthesize(&self.greeting).await?;

        self.state = SessionState::Idle;
        tracing::info!("session started");

        self.play(greeting).await;
        Ok(())
    }

    /// Begin recording a user turn
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before the session begins,
    /// `AlreadyRecording` while a turn is being recorded, or the
    /// capture failure (`DeviceUnavailable`, `PermissionDenied`) that
    /// left the session in `Idle`.
    pub fn start_recording(&mut self) -> Result<()> {
        match self.state {
            SessionState::NotStarted => Err(Error::NotStarted),
            SessionState::Recording => Err(Error::AlreadyRecording),
            SessionState::Idle => {
                self.capture.start()?;
                self.state = SessionState::Recording;
                tracing::debug!("recording turn");
                Ok(())
            }
        }
    }

    /// Finish recording, send the turn for transcription, and play the
    /// spoken reply
    ///
    /// The session returns to `Idle` as soon as capture has ended, even
    /// when finalization or transcription fails — the turn is lost but
    /// the state machine stays consistent.
    ///
    /// # Errors
    ///
    /// Returns `NotRecording` if no turn is being recorded,
    /// `EmptyRecording` for an instant start/stop, or the remote
    /// failure for the lost turn.
    pub async fn stop_recording(&mut self) -> Result<()> {
        if self.state != SessionState::Recording {
            return Err(Error::NotRecording);
        }

        let finished = self.capture.stop().await;
        // Capture has ended and the device is released either way
        self.state = SessionState::Idle;

        let clip = finished?;
        if clip.is_empty() {
            return Err(Error::EmptyRecording);
        }

        tracing::debug!(bytes = clip.len(), "uploading turn");
        let reply = self.speech.transcribe_and_respond(clip).await?;

        self.play(reply).await;
        Ok(())
    }

    /// Queue a clip for playback; playback failures are reported but
    /// never fail the transition that produced the clip
    async fn play(&mut self, clip: AudioClip) {
        let failed = self.queue.enqueue(clip).await;
        if failed > 0 {
            tracing::warn!(failed, "playback failed for queued clip");
        }
    }
}
