//! Voice selection for the speech preview.
//!
//! The studio exposes two speaker identities; each maps to one of the remote
//! model's prebuilt voices.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Playback-rate presets offered to the user.
pub const SPEED_PRESETS: [f32; 4] = [0.5, 1.0, 1.25, 1.5];

/// Speaker identity for speech generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Deep, warm narrator.
    Male,
    /// Expressive "muse" narrator.
    #[default]
    Female,
}

impl Speaker {
    /// Name of the prebuilt remote voice for this speaker.
    pub fn voice_name(self) -> &'static str {
        match self {
            Speaker::Male => "Fenrir",
            Speaker::Female => "Kore",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Speaker::Male => "Male – deep and warm (Expert)",
            Speaker::Female => "Female – expressive (Muse)",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Speaker::Male => "male",
            Speaker::Female => "female",
        })
    }
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Speaker::Male),
            "female" | "f" => Ok(Speaker::Female),
            other => Err(format!("unknown speaker '{}' (expected 'male' or 'female')", other)),
        }
    }
}

/// Speaker plus playback-rate multiplier.
///
/// `speed` is applied by the playback controller, not by the remote model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub speaker: Speaker,
    pub speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self { speaker: Speaker::Female, speed: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_names() {
        assert_eq!(Speaker::Male.voice_name(), "Fenrir");
        assert_eq!(Speaker::Female.voice_name(), "Kore");
    }

    #[test]
    fn test_parse_speaker() {
        assert_eq!("Male".parse::<Speaker>().unwrap(), Speaker::Male);
        assert_eq!(" f ".parse::<Speaker>().unwrap(), Speaker::Female);
        assert!("robot".parse::<Speaker>().is_err());
        assert_eq!(Speaker::Male.to_string().parse::<Speaker>().unwrap(), Speaker::Male);
    }

    #[test]
    fn test_default_config() {
        let cfg = VoiceConfig::default();
        assert_eq!(cfg.speaker, Speaker::Female);
        assert_eq!(cfg.speed, 1.0);
        assert!(SPEED_PRESETS.contains(&cfg.speed));
    }
}
