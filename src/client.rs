//! Generation client boundary: the two remote operations the studio needs.
//!
//! Everything that talks to the network sits behind [`GenerationClient`], so
//! the codec, playback and studio layers run against synthetic payloads in
//! tests. [`GeminiClient`](crate::gemini::GeminiClient) is the production
//! implementation.
//!
//! Both calls are single-shot: no retry, no backoff. Callers surface the
//! failure and wait for the user to try again.

use async_trait::async_trait;
use thiserror::Error;

use crate::{prompt::ScriptOptions, voice::Speaker};

#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key was configured.
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingCredential,

    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("could not reach the generation service: {0}")]
    Connectivity(#[source] reqwest::Error),

    /// The service answered with a non-success status (bad key, quota, …).
    #[error("generation service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON shape.
    #[error("malformed response from generation service: {0}")]
    Malformed(String),

    /// The speech response carried no inline audio payload.
    #[error("no audio data in speech response")]
    NoAudioData,

    /// The inline audio payload was not valid base64.
    #[error("audio payload is not valid base64: {0}")]
    InvalidAudioPayload(#[from] base64::DecodeError),
}

impl GenerationError {
    /// True for failures of the remote call itself, as opposed to a reply
    /// that arrived but was unusable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GenerationError::Connectivity(_) | GenerationError::Api { .. } | GenerationError::MissingCredential
        )
    }
}

/// The remote text and speech generation service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a screenplay for `text` styled by `options`.
    ///
    /// Returns the model's markdown prose.
    async fn generate_script(&self, text: &str, options: &ScriptOptions) -> Result<String, GenerationError>;

    /// Synthesise `text` with the given speaker.
    ///
    /// Returns base64 of raw 16-bit little-endian PCM (24 kHz mono for
    /// Gemini). `speed` is part of the interface but implementations are not
    /// expected to honour it; playback rate is applied locally.
    async fn generate_speech(&self, text: &str, speaker: Speaker, speed: f32) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for std::sync::Arc<T> {
    async fn generate_script(&self, text: &str, options: &ScriptOptions) -> Result<String, GenerationError> {
        (**self).generate_script(text, options).await
    }

    async fn generate_speech(&self, text: &str, speaker: Speaker, speed: f32) -> Result<String, GenerationError> {
        (**self).generate_speech(text, speaker, speed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(GenerationError::Api { status: 429, message: "quota".into() }.is_transport());
        assert!(GenerationError::MissingCredential.is_transport());
        assert!(!GenerationError::NoAudioData.is_transport());
        assert!(!GenerationError::Malformed("x".into()).is_transport());
    }

    #[test]
    fn test_no_audio_message() {
        assert_eq!(GenerationError::NoAudioData.to_string(), "no audio data in speech response");
    }
}
