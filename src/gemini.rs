//! Gemini REST client: implements [`GenerationClient`] over
//! `POST /v1beta/models/{model}:generateContent`.
//!
//! | Operation         | Model (default)                  | Reply                           |
//! |-------------------|----------------------------------|---------------------------------|
//! | `generate_script` | `gemini-3-pro-preview`           | markdown text parts             |
//! | `generate_speech` | `gemini-2.5-flash-preview-tts`   | `inlineData.data` (base64 PCM)  |
//!
//! The credential goes in the `x-goog-api-key` header. A missing key is only
//! reported when a request is attempted, so the studio can start without one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    client::{GenerationClient, GenerationError},
    config::{ApiKey, StudioConfig},
    prompt::{build_user_prompt, ScriptOptions, SYSTEM_INSTRUCTION},
    voice::Speaker,
};

/// Returned in place of an empty script reply.
pub const EMPTY_SCRIPT_FALLBACK: &str = "Could not generate content. Please try again.";

// ─────────────────────────────────────────────────────────────────────────────
// Wire types: request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'a str>, text: &'a str) -> Self {
        Self { role, parts: vec![TextPart { text }] }
    }
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types: response
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    #[allow(dead_code)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text parts of the first candidate, if any are non-empty.
    fn text(&self) -> Option<String> {
        let text: String = self.first_parts().iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First non-empty inline audio payload of the first candidate.
    fn audio_base64(&self) -> Option<&str> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .find(|d| !d.is_empty())
    }
}

/// Map a non-success reply to [`GenerationError::Api`], preferring the
/// service's own error message over the raw body.
fn api_error(status: u16, body: &[u8]) -> GenerationError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    GenerationError::Api { status, message }
}

// ─────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ─────────────────────────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::Client,
    key: Option<ApiKey>,
    endpoint: String,
    script_model: String,
    speech_model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Build a client from `config`. `key` may be `None`; requests then fail
    /// with [`GenerationError::MissingCredential`].
    pub fn new(config: &StudioConfig, key: Option<ApiKey>) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(GenerationError::Connectivity)?;
        Ok(Self::with_http(http, config, key))
    }

    /// Use a caller-built HTTP client (proxy, TLS or timeout settings).
    pub fn with_http(http: reqwest::Client, config: &StudioConfig, key: Option<ApiKey>) -> Self {
        Self {
            http,
            key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            script_model: config.script_model.clone(),
            speech_model: config.speech_model.clone(),
            temperature: config.temperature,
        }
    }

    /// [`new`](Self::new) with the key taken from the environment.
    pub fn from_env(config: &StudioConfig) -> Result<Self, GenerationError> {
        Self::new(config, ApiKey::from_env())
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }

    async fn post(&self, model: &str, body: &GenerateRequest<'_>) -> Result<GenerateResponse, GenerationError> {
        let key = self.key.as_ref().ok_or(GenerationError::MissingCredential)?;

        let response = self
            .http
            .post(self.url(model))
            .header("x-goog-api-key", key.expose())
            .json(body)
            .send()
            .await
            .map_err(GenerationError::Connectivity)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(GenerationError::Connectivity)?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|e| GenerationError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate_script(&self, text: &str, options: &ScriptOptions) -> Result<String, GenerationError> {
        let prompt = build_user_prompt(text, options);
        let request = GenerateRequest {
            system_instruction: Some(Content::text(None, SYSTEM_INSTRUCTION)),
            contents: vec![Content::text(Some("user"), &prompt)],
            generation_config: GenerationConfig {
                temperature: Some(self.temperature),
                ..GenerationConfig::default()
            },
        };

        debug!(model = %self.script_model, prompt_chars = prompt.len(), "requesting script");
        let response = self.post(&self.script_model, &request).await.map_err(|e| {
            warn!(error = %e, "script generation failed");
            e
        })?;

        match response.text() {
            Some(script) => {
                info!(chars = script.len(), "script generated");
                Ok(script)
            }
            None => {
                warn!("script reply had no text");
                Ok(EMPTY_SCRIPT_FALLBACK.to_string())
            }
        }
    }

    async fn generate_speech(&self, text: &str, speaker: Speaker, speed: f32) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content::text(None, text)],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: speaker.voice_name() },
                    },
                }),
                ..GenerationConfig::default()
            },
        };

        // The TTS model has no rate control; `speed` is applied at playback.
        debug!(
            model = %self.speech_model,
            voice = speaker.voice_name(),
            speed,
            chars = text.len(),
            "requesting speech"
        );
        let response = self.post(&self.speech_model, &request).await.map_err(|e| {
            warn!(error = %e, "speech generation failed");
            e
        })?;

        let audio = response.audio_base64().ok_or_else(|| {
            warn!("speech reply had no inline audio");
            GenerationError::NoAudioData
        })?;
        info!(base64_len = audio.len(), "speech generated");
        Ok(audio.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
