//! Speech service client
//!
//! Wraps the three conversation endpoints of the clinic backend:
//! history reset, transcribe-and-respond, and synthesis. The client is
//! stateless; conversation history lives server-side and is only ever
//! cleared from here.

use async_trait::async_trait;

use crate::api::remote_error;
use crate::voice::AudioClip;
use crate::{Error, Result};

/// Content type assumed when the backend omits one (gTTS returns MP3)
const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

/// Filename the backend expects for uploaded turns
const UPLOAD_FILENAME: &str = "user_audio.wav";

/// Remote speech operations the voice session depends on
#[async_trait]
pub trait SpeechBackend {
    /// Reset server-side conversation history
    ///
    /// Must be awaited to completion before the first transcription of
    /// a session so a stale history never leaks into a new one.
    ///
    /// # Errors
    ///
    /// Returns `Remote` on a non-success response.
    async fn clear_history(&self) -> Result<()>;

    /// Upload a recorded turn; the backend transcribes it and returns
    /// synthesized audio of the assistant's reply
    ///
    /// # Errors
    ///
    /// Returns `Remote` on a non-success response, or
    /// `MalformedResponse` if the body is not usable audio.
    async fn transcribe_and_respond(&self, clip: AudioClip) -> Result<AudioClip>;

    /// Request synthesized speech for a text
    ///
    /// # Errors
    ///
    /// Returns `Remote` on a non-success response, or
    /// `MalformedResponse` if the body is not usable audio.
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

/// Client for the clinic backend's speech endpoints
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
}

impl SpeechClient {
    /// Create a client for a backend base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client with a preconfigured `reqwest::Client`
    /// (e.g. one carrying request timeouts)
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechBackend for SpeechClient {
    async fn clear_history(&self) -> Result<()> {
        let url = format!("{}/clear-history/", self.base_url);
        let response = self.client.post(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "clear-history failed");
            return Err(remote_error(response).await);
        }

        tracing::debug!("history cleared");
        Ok(())
    }

    async fn transcribe_and_respond(&self, clip: AudioClip) -> Result<AudioClip> {
        tracing::debug!(bytes = clip.len(), "uploading audio for transcription");

        let mime = clip.content_type().to_string();
        let part = reqwest::multipart::Part::bytes(clip.into_bytes())
            .file_name(UPLOAD_FILENAME)
            .mime_str(&mime)
            .map_err(|e| Error::Audio(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/transcribe/", self.base_url);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        tracing::debug!(status = %status, "transcription response received");

        if !status.is_success() {
            tracing::error!(status = %status, "transcription failed");
            return Err(remote_error(response).await);
        }

        read_audio(response).await
    }

    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        #[derive(serde::Serialize)]
        struct SynthesizeRequest<'a> {
            text: &'a str,
        }

        tracing::debug!(text, "requesting synthesis");

        let url = format!("{}/synthesize/", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SynthesizeRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "synthesis failed");
            return Err(remote_error(response).await);
        }

        read_audio(response).await
    }
}

/// Read a success response as an opaque playable clip
///
/// The bytes are never re-interpreted; only the content-type tag and
/// non-emptiness are checked.
async fn read_audio(response: reqwest::Response) -> Result<AudioClip> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_AUDIO_TYPE.to_string());

    if content_type.starts_with("text/") || content_type.contains("json") {
        return Err(Error::MalformedResponse(format!(
            "expected audio, got {content_type}"
        )));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(Error::MalformedResponse("empty audio body".to_string()));
    }

    tracing::debug!(bytes = bytes.len(), content_type, "received audio");
    Ok(AudioClip::new(bytes.to_vec(), content_type))
}
