//! Configuration management for the clinic voice client
//!
//! Settings are layered: built-in defaults, then an optional
//! `config.toml` in the XDG config directory, then environment
//! variables. Environment wins.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Default backend base URL (the FastAPI appointment service)
const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Greeting spoken when a conversation session starts
pub const DEFAULT_GREETING: &str = "Welcome to Dr. Walnut's Clinic! \
    Would you like to schedule, reschedule, or cancel an appointment?";

/// Clinic voice client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the clinic backend
    pub server_url: String,

    /// Greeting text synthesized at session start
    pub greeting: String,

    /// Voice configuration
    pub voice: VoiceConfig,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone capture and speaker playback
    pub enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// On-disk configuration file shape (all fields optional)
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    server_url: Option<String>,
    greeting: Option<String>,
    #[serde(default)]
    voice: VoiceFile,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFile {
    enabled: Option<bool>,
}

/// Return the XDG config directory for the client
///
/// Uses `~/.config/walnutclinic/clinic-voice/` on Linux
#[must_use]
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("example", "walnutclinic", "clinic-voice").map_or_else(
        || PathBuf::from(".config/clinic-voice"),
        |d| d.config_dir().to_path_buf(),
    )
}

impl Config {
    /// Load configuration from file, environment, and defaults
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with an explicit server override and voice
    /// disable option (both from the CLI)
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load_with_options(server_override: Option<&str>, disable_voice: bool) -> Result<Self> {
        let file = Self::load_file(&config_dir().join("config.toml"))?;

        let server_url = server_override
            .map(ToString::to_string)
            .or_else(|| std::env::var("CLINIC_SERVER_URL").ok())
            .or(file.server_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let greeting = std::env::var("CLINIC_GREETING")
            .ok()
            .or(file.greeting)
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());

        let enabled = !disable_voice && file.voice.enabled.unwrap_or(true);

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        Ok(Self {
            server_url,
            greeting,
            voice: VoiceConfig { enabled },
        })
    }

    /// Parse a config file if it exists
    fn load_file(path: &std::path::Path) -> Result<ConfigFile> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let file = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let file = Config::load_file(std::path::Path::new("/nonexistent/config.toml")).unwrap();
        assert!(file.server_url.is_none());
        assert!(file.voice.enabled.is_none());
    }

    #[test]
    fn file_values_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server_url = \"http://clinic.internal:9000\"\n\n[voice]\nenabled = false\n",
        )
        .unwrap();

        let file = Config::load_file(&path).unwrap();
        assert_eq!(
            file.server_url.as_deref(),
            Some("http://clinic.internal:9000")
        );
        assert_eq!(file.voice.enabled, Some(false));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = [not toml").unwrap();

        assert!(Config::load_file(&path).is_err());
    }
}
