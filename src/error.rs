//! Error types for the clinic voice client

use thiserror::Error;

/// Result type alias for clinic voice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the clinic voice client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable audio capture device on this machine
    #[error("audio capture unavailable: {0}")]
    DeviceUnavailable(String),

    /// The platform refused access to the microphone
    #[error("microphone permission denied")]
    PermissionDenied,

    /// A capture was started while one is already running
    #[error("already recording")]
    AlreadyRecording,

    /// A capture was stopped while none is running
    #[error("not recording")]
    NotRecording,

    /// The conversation session was started twice
    #[error("session already started")]
    SessionStarted,

    /// A recording trigger arrived before the session was started
    #[error("session not started")]
    NotStarted,

    /// The finished capture contained no audio
    #[error("recording captured no audio")]
    EmptyRecording,

    /// Non-success response from the clinic backend
    #[error("server error {status}: {detail}")]
    Remote {
        /// HTTP status code returned by the backend
        status: u16,
        /// Server-provided detail message, or the raw body
        detail: String,
    },

    /// Backend returned success but the body is not usable audio
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Local audio playback failed
    #[error("playback error: {0}")]
    Playback(String),

    /// Audio encoding or decoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Deletion attempted on a slot that is already booked
    #[error("time slot is already booked")]
    SlotBooked,

    /// A new time slot failed client-side validation
    #[error("invalid time slot: {0}")]
    InvalidSlot(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
