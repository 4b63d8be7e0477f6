//! Script request assembly: style presets, system instruction, user prompt.
//!
//! The remote model receives two texts:
//!
//! | Part               | Source                                   |
//! |--------------------|------------------------------------------|
//! | system instruction | [`SYSTEM_INSTRUCTION`] (fixed)           |
//! | user prompt        | [`build_user_prompt`] (idea + 9 options) |
//!
//! The system instruction pins the markdown layout that
//! [`Screenplay::parse`](crate::script::Screenplay::parse) reads back.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Fixed instruction describing the required output structure.
pub const SYSTEM_INSTRUCTION: &str = r#"
You are an AI screenwriter, director, storyboard supervisor, style composer and content librarian.
TASK: turn the user's idea into a film script for text-to-video generators (VEO3 / Sora).

MANDATORY OUTPUT FORMAT (MARKDOWN):
# 🧾 LIBRARY ENTRY
- **ID:** [unique id]
- **TITLE:** [striking title]
- **GENRE:** [genre]
- **TAGS:** [hashtags]
- **SUMMARY:** [short synopsis]

# 👤 CHARACTER BIBLE
(Main characters with: age, appearance, wardrobe, voice, personality)

# 🎬 SERIES STRUCTURE
- **Series Title:** ...
- **Season 1:**
  - **Episode 1:** [episode title]
    - **Chapter 1:** [chapter title]

# 📽️ SCENE SCRIPT
**[SCENE 1]** [LOCATION - TIME]
**Visual:** [detailed shot description for AI video: camera angle, lighting, colour]
**Audio:** [music, SFX]
**Action:** [character action]
**Dialogue:**
[Name]: [line]

---
STRICTLY FOLLOW THE USER'S STYLE, MUSIC AND VOICE ADJUSTMENTS.
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Preset vocabularies
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! presets {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every preset, in menu order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display label: also the value sent to the model.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

presets! {
    /// Story genre.
    Genre {
        HardSciFi => "Hard Sci-Fi",
        Mystery => "Mystery / Detective",
        PsychologicalThriller => "Psychological Thriller",
        Fantasy => "Fantasy / Mythology",
        Cyberpunk => "Cyberpunk / Dystopian",
        Historical => "Historical Drama",
        SliceOfLife => "Romance / Slice of Life",
        ActionMecha => "Action / Mecha",
        TravelDoc => "Travel Documentary",
        ArtHouse => "Fashion Film / Art House",
    }
}

presets! {
    /// Visual look.
    AestheticStyle {
        Cinematic4k => "Cinematic 4K",
        FilmNoir => "Film Noir",
        NeonVaporwave => "Neon Vaporwave",
        RetroVhs => "Retro VHS 90s",
        AnimeShinkai => "Anime (Makoto Shinkai style)",
        Watercolor => "Watercolor",
        GothicDark => "Gothic Dark Fantasy",
        Minimalist => "Minimalist",
        CleanFuture => "Clean Future",
        GrittyRealism => "Gritty Realism",
    }
}

presets! {
    /// Score / soundtrack style.
    MusicStyle {
        EpicOrchestral => "Epic Orchestral",
        Synthwave => "Synthwave",
        LofiChill => "Lofi Chill",
        DarkAmbient => "Dark Ambient (Horror)",
        JazzNoir => "Jazz Noir",
        IntenseRock => "Intense Rock",
        TraditionalAsian => "Traditional East Asian Instruments",
        Industrial => "Techno / Industrial",
        EmotionalPiano => "Emotional Piano",
        SilenceFx => "Silence + Foley (ASMR)",
    }
}

presets! {
    /// Character voice direction.
    VoiceCharacter {
        MaleDeep => "Male – deep and warm / businessman",
        FemaleWarm => "Female – expressive / muse",
        MaleAggressive => "Male – powerful / warrior",
        FemaleNews => "Female – news anchor / sharp",
        Robotic => "Robot / AI voice",
        Elderly => "Elderly storyteller",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptOptions
// ─────────────────────────────────────────────────────────────────────────────

/// The nine style fields sent with every script request.
///
/// Preset-backed fields hold the preset label, but any free text is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptOptions {
    pub genre: String,
    pub aesthetic: String,
    pub music: String,
    pub setting: String,
    pub voice_style: String,
    pub character_ability: String,
    pub visual_controls: String,
    pub music_controls: String,
    pub voice_controls: String,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            genre: Genre::HardSciFi.label().to_string(),
            aesthetic: AestheticStyle::Cinematic4k.label().to_string(),
            music: MusicStyle::EpicOrchestral.label().to_string(),
            setting: String::new(),
            voice_style: VoiceCharacter::FemaleWarm.label().to_string(),
            character_ability: String::new(),
            visual_controls: String::new(),
            music_controls: String::new(),
            voice_controls: String::new(),
        }
    }
}

/// Build the user-turn prompt: the idea, every option, and the deliverables.
pub fn build_user_prompt(idea: &str, options: &ScriptOptions) -> String {
    let fields: [(&str, &str); 9] = [
        ("Genre", options.genre.as_str()),
        ("Aesthetic style", options.aesthetic.as_str()),
        ("Music style", options.music.as_str()),
        ("Setting", options.setting.as_str()),
        ("Character voice", options.voice_style.as_str()),
        ("Character abilities", options.character_ability.as_str()),
        ("Visual adjustments", options.visual_controls.as_str()),
        ("Music adjustments", options.music_controls.as_str()),
        ("Voice adjustments", options.voice_controls.as_str()),
    ];

    let mut prompt = format!("\nUser content: {}\n\nConfiguration:\n", idea.trim());
    for (name, value) in fields {
        // Writing into a String cannot fail.
        let _ = writeln!(prompt, "- {}: {}", name, value.trim());
    }
    prompt.push_str(
        "\nCreate:\n\
         1. Library Entry\n\
         2. Character Bible\n\
         3. Series Structure\n\
         4. Detailed scene script (Chapter 1)\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let o = ScriptOptions::default();
        assert_eq!(o.genre, "Hard Sci-Fi");
        assert_eq!(o.aesthetic, "Cinematic 4K");
        assert_eq!(o.music, "Epic Orchestral");
        assert_eq!(o.voice_style, VoiceCharacter::FemaleWarm.label());
        assert!(o.setting.is_empty() && o.voice_controls.is_empty());
    }

    #[test]
    fn test_prompt_contains_every_field() {
        let o = ScriptOptions {
            setting: "Orbital station, 2190".into(),
            character_ability: "time dilation".into(),
            visual_controls: "teal and orange".into(),
            music_controls: "low drones".into(),
            voice_controls: "whispered".into(),
            ..ScriptOptions::default()
        };
        let p = build_user_prompt("  A courier loses a day.  ", &o);
        assert!(p.contains("User content: A courier loses a day.\n"));
        for needle in [
            "- Genre: Hard Sci-Fi",
            "- Aesthetic style: Cinematic 4K",
            "- Music style: Epic Orchestral",
            "- Setting: Orbital station, 2190",
            "- Character abilities: time dilation",
            "- Visual adjustments: teal and orange",
            "- Music adjustments: low drones",
            "- Voice adjustments: whispered",
            "4. Detailed scene script (Chapter 1)",
        ] {
            assert!(p.contains(needle), "missing {:?}", needle);
        }
    }

    #[test]
    fn test_preset_lists() {
        assert_eq!(Genre::ALL.len(), 10);
        assert_eq!(AestheticStyle::ALL.len(), 10);
        assert_eq!(MusicStyle::ALL.len(), 10);
        assert_eq!(VoiceCharacter::ALL.len(), 6);
        assert_eq!(Genre::Cyberpunk.to_string(), "Cyberpunk / Dystopian");
    }

    #[test]
    fn test_options_json_camel_case() {
        let o: ScriptOptions =
            serde_json::from_str(r#"{"voiceStyle":"Robot / AI voice","setting":"Mars"}"#).unwrap();
        assert_eq!(o.voice_style, "Robot / AI voice");
        assert_eq!(o.setting, "Mars");
        assert_eq!(o.genre, "Hard Sci-Fi");
    }

    #[test]
    fn test_system_instruction_sections() {
        for header in ["LIBRARY ENTRY", "CHARACTER BIBLE", "SERIES STRUCTURE", "SCENE SCRIPT"] {
            assert!(SYSTEM_INSTRUCTION.contains(header));
        }
    }
}
