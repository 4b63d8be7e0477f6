//! # screenplay-studio
//!
//! Screenplay generation and voice preview backed by the Gemini API.
//! A story idea plus style options goes out to a hosted model; a structured
//! screenplay comes back. A snippet of it is then voiced by the speech model,
//! played locally and offered as a downloadable WAV.
//!
//! ## Quick start
//!
//! ```no_run
//! use screenplay_studio::{GeminiClient, ScriptStudio, StudioConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = StudioConfig::default();
//! // Reads GEMINI_API_KEY (or API_KEY) from the environment.
//! let client = GeminiClient::from_env(&config)?;
//!
//! let mut studio = ScriptStudio::new(client);
//! studio.idea = "A lighthouse keeper on Europa hears music under the ice".into();
//! match studio.generate().await {
//!     Some(script) => println!("{}", script.raw()),
//!     None => eprintln!("{}", studio.notice().unwrap_or_default()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Raw audio without the network:
//!
//! ```
//! use screenplay_studio::codec::{decode_pcm16, encode_wav, PcmFormat};
//!
//! let pcm = [0x00, 0x40, 0x00, 0xC0]; // 16384, -16384
//! let buffer = decode_pcm16(&pcm, PcmFormat::default());
//! assert_eq!(buffer.channel(0).unwrap(), &[0.5, -0.5]);
//!
//! let wav = encode_wav(&buffer);
//! assert_eq!(wav.len(), 48);
//! assert_eq!(&wav[44..], &pcm);
//! ```
//!
//! ## Features
//! | Feature    | Enables                                                        |
//! |------------|----------------------------------------------------------------|
//! | *(none)*   | codec, artifacts, playback state machine, client, studio       |
//! | `playback` | [`output::RodioOutput`] device backend (ALSA headers on Linux) |
//! | `demo`     | `playback` + clap/tokio/tracing-subscriber for `demos/studio.rs` |
//!
//! ## Voice pipeline
//! 1. **Snippet**: first 500 characters of the screenplay seed the text box.
//! 2. **Speech request**: Gemini TTS returns base64 of 16-bit LE PCM, 24 kHz mono.
//! 3. **Decode**: PCM → per-channel `f32` in [-1, 1] (÷ 32768).
//! 4. **Encode**: samples → 44-byte-header WAV, bit-exact with the input PCM.
//! 5. **Artifact**: WAV bytes behind a revocable `blob:` URL.
//! 6. **Playback**: one session at a time, at the chosen speed.

pub mod artifact;
pub mod client;
pub mod codec;
pub mod config;
pub mod gemini;
pub mod playback;
pub mod prompt;
pub mod script;
pub mod studio;
pub mod voice;

// Device backend: rodio pulls in cpal and the platform audio libraries.
#[cfg(feature = "playback")]
pub mod output;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use artifact::{ArtifactHandle, ArtifactStore};
pub use client::{GenerationClient, GenerationError};
pub use codec::{SampleBuffer, SAMPLE_RATE};
pub use config::{ApiKey, StudioConfig};
pub use gemini::GeminiClient;
pub use playback::{PlaybackController, PlaybackState, Toggle};
pub use prompt::ScriptOptions;
pub use script::Screenplay;
pub use studio::{ScriptStudio, VoiceStudio};
pub use voice::{Speaker, VoiceConfig};
