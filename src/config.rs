//! Studio configuration.
//!
//! Every field has a default, so an empty `{}` (or no file at all) is a valid
//! configuration. The API key is never read from the file: it comes from the
//! environment only.
//!
//! ```json
//! {
//!   "endpoint": "https://generativelanguage.googleapis.com",
//!   "scriptModel": "gemini-3-pro-preview",
//!   "speechModel": "gemini-2.5-flash-preview-tts",
//!   "temperature": 0.7,
//!   "snippetChars": 500
//! }
//! ```

use std::{fmt, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::{codec::PcmFormat, script::SNIPPET_CHARS};

/// Primary credential variable.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Fallback credential variable.
pub const API_KEY_FALLBACK_VAR: &str = "API_KEY";

/// Suggested filename for the downloadable WAV.
pub const DOWNLOAD_FILENAME: &str = "voice_studio_output.wav";

// ─────────────────────────────────────────────────────────────────────────────
// ApiKey
// ─────────────────────────────────────────────────────────────────────────────

/// API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read `GEMINI_API_KEY`, falling back to `API_KEY`. Blank values count
    /// as unset.
    pub fn from_env() -> Option<Self> {
        [API_KEY_VAR, API_KEY_FALLBACK_VAR]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StudioConfig
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StudioConfig {
    /// Base URL of the Gemini REST API.
    pub endpoint: String,
    /// Model used for screenplay generation.
    pub script_model: String,
    /// Model used for speech generation.
    pub speech_model: String,
    /// Sampling temperature for screenplay generation.
    pub temperature: f32,
    /// Whole-request timeout for remote calls.
    pub request_timeout_secs: u64,
    /// Sample rate of the PCM returned by the speech model.
    pub sample_rate: u32,
    /// Channel count of the PCM returned by the speech model.
    pub channels: u16,
    /// Length of the initial voice-studio snippet.
    pub snippet_chars: usize,
    /// Suggested filename for the WAV download.
    pub download_filename: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            script_model: "gemini-3-pro-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            temperature: 0.7,
            request_timeout_secs: 120,
            sample_rate: crate::codec::SAMPLE_RATE,
            channels: 1,
            snippet_chars: SNIPPET_CHARS,
            download_filename: DOWNLOAD_FILENAME.to_string(),
        }
    }
}

impl StudioConfig {
    /// Parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(bytes).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature {} is outside 0.0–2.0", self.temperature);
        }
        if self.download_filename.contains(['/', '\\']) {
            bail!("download filename '{}' must not contain a path", self.download_filename);
        }
        self.pcm_format()?;
        Ok(())
    }

    /// The PCM layout the speech model returns.
    pub fn pcm_format(&self) -> Result<PcmFormat> {
        PcmFormat::new(self.sample_rate, self.channels).context("Invalid PCM format in config")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
