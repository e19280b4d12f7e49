//! Clinic Voice - voice scheduling client for the clinic appointment portal
//!
//! This library provides the core functionality of the client:
//! - The voice conversation session (capture, transcription upload,
//!   reply playback) with its small state machine
//! - HTTP clients for the clinic backend's speech and time-slot APIs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     CLI shell                        │
//! │   voice session  │  slot admin  │  hardware tests   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 VoiceSession                         │
//! │   MicCapture  │  PlaybackQueue  │  state machine    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │             Clinic backend (remote)                  │
//! │   /clear-history/ │ /transcribe/ │ /synthesize/     │
//! │   /timeslots/                                        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod voice;

pub use api::{NewTimeSlot, SpeechBackend, SpeechClient, TimeSlot, TimeSlotClient};
pub use config::Config;
pub use error::{Error, Result};
pub use voice::{
    AudioClip, CaptureBackend, MicCapture, PlaybackQueue, PlaybackSink, RecordingState,
    SAMPLE_RATE, SessionState, SpeakerSink, UiAction, VoiceSession,
};
