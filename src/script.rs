//! Screenplay document: reads the markdown the script model returns.
//!
//! The system instruction asks for four level-1 sections:
//!
//! 1. **LIBRARY ENTRY**: `- **ID:** …` style bullet fields.
//! 2. **CHARACTER BIBLE**: free prose.
//! 3. **SERIES STRUCTURE**: nested bullets.
//! 4. **SCENE SCRIPT**: `**[SCENE n]**` blocks with Visual / Audio / Action /
//!    Dialogue parts.
//!
//! Parsing is lenient: the model does not always follow the layout, so
//! unknown headings become [`SectionKind::Other`] and missing fields are
//! simply absent. The raw text is always kept.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default length of the voice-studio snippet, in characters.
pub const SNIPPET_CHARS: usize = 500;

/// Level-1 heading: `# 🧾 LIBRARY ENTRY`.
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").unwrap());

/// Bullet field: `- **TITLE:** Night Shift`.
static RE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]*\*\*([^*:\n]+):\*\*[ \t]*(.*?)[ \t]*$").unwrap());

/// Scene marker: `**[SCENE 3]** INT. LAB - NIGHT`.
static RE_SCENE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*\*\[SCENE[ \t]+(\d+)\]\*\*[ \t]*(.*?)[ \t]*$").unwrap());

/// Labelled scene part: `**Visual:** …`.
static RE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\*\*(Visual|Audio|Action|Dialogue):\*\*\s*(.*?)\s*$").unwrap());

/// Dialogue line: `Mara: We're out of time.` or `**Mara**: …`.
static RE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\**\[?([^\]:*\[]{1,40}?)\]?\**\s*:\s*(.+?)\s*$").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    LibraryEntry,
    CharacterBible,
    SeriesStructure,
    SceneScript,
    Other,
}

impl SectionKind {
    fn classify(title: &str) -> Self {
        let t = title.to_uppercase();
        if t.contains("LIBRARY") {
            SectionKind::LibraryEntry
        } else if t.contains("CHARACTER") {
            SectionKind::CharacterBible
        } else if t.contains("SERIES") || t.contains("STRUCTURE") {
            SectionKind::SeriesStructure
        } else if t.contains("SCRIPT") || t.contains("SCENE") {
            SectionKind::SceneScript
        } else {
            SectionKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Heading text without the leading `#`.
    pub title: String,
    pub body: String,
}

/// Catalogue fields from the LIBRARY ENTRY section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub tags: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    pub number: u32,
    /// Location / time slug after the marker.
    pub heading: String,
    pub visual: Option<String>,
    pub audio: Option<String>,
    pub action: Option<String>,
    /// `(speaker, line)` pairs in order.
    pub dialogue: Vec<(String, String)>,
}

/// A generated screenplay: the raw markdown plus its level-1 sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenplay {
    raw: String,
    sections: Vec<Section>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

impl Screenplay {
    /// Split `text` on level-1 headings. Text before the first heading is
    /// kept in the raw markdown only.
    pub fn parse(text: &str) -> Self {
        let heads: Vec<_> = RE_HEADING.captures_iter(text).collect();
        let mut sections = Vec::with_capacity(heads.len());
        for (i, cap) in heads.iter().enumerate() {
            let whole = cap.get(0).map_or(0..0, |m| m.range());
            let end = heads
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let title = cap[1].to_string();
            sections.push(Section {
                kind: SectionKind::classify(&title),
                title,
                body: text[whole.end..end].trim().to_string(),
            });
        }
        Self { raw: text.to_string(), sections }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// First section of the given kind.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn library_entry(&self) -> LibraryEntry {
        let mut entry = LibraryEntry::default();
        let Some(section) = self.section(SectionKind::LibraryEntry) else {
            return entry;
        };
        for cap in RE_FIELD.captures_iter(&section.body) {
            let value = non_empty(&cap[2]);
            match cap[1].trim().to_uppercase().as_str() {
                "ID" => entry.id = value,
                "TITLE" => entry.title = value,
                "GENRE" => entry.genre = value,
                "TAGS" => entry.tags = value,
                "SUMMARY" => entry.summary = value,
                _ => {}
            }
        }
        entry
    }

    /// Scenes found anywhere in the document (normally the SCENE SCRIPT
    /// section, but the marker is searched globally).
    pub fn scenes(&self) -> Vec<Scene> {
        let marks: Vec<_> = RE_SCENE.captures_iter(&self.raw).collect();
        let mut scenes = Vec::with_capacity(marks.len());
        for (i, cap) in marks.iter().enumerate() {
            let start = cap.get(0).map_or(0, |m| m.end());
            let end = marks
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(self.raw.len(), |m| m.start());
            let mut scene = Scene {
                number: cap[1].parse().unwrap_or(0),
                heading: cap[2].to_string(),
                ..Scene::default()
            };
            parse_scene_body(&self.raw[start..end], &mut scene);
            scenes.push(scene);
        }
        scenes
    }
}

fn parse_scene_body(body: &str, scene: &mut Scene) {
    let mut in_dialogue = false;
    for line in body.lines() {
        if line.trim() == "---" || RE_HEADING.is_match(line) {
            break;
        }
        if let Some(cap) = RE_PART.captures(line) {
            let value = non_empty(&cap[2]);
            in_dialogue = false;
            match &cap[1] {
                "Visual" => scene.visual = value,
                "Audio" => scene.audio = value,
                "Action" => scene.action = value,
                _ => {
                    in_dialogue = true;
                    // `**Dialogue:** Mara: …` on one line
                    if let Some(v) = value {
                        push_dialogue(&v, scene);
                    }
                }
            }
        } else if in_dialogue {
            push_dialogue(line, scene);
        }
    }
}

fn push_dialogue(line: &str, scene: &mut Scene) {
    if let Some(cap) = RE_LINE.captures(line) {
        scene.dialogue.push((cap[1].trim().to_string(), cap[2].to_string()));
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// First `max_chars` characters of `text` followed by `"..."`.
///
/// This seeds the voice studio's text box; the user edits it from there.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let cut = text.char_indices().nth(max_chars).map_or(text.len(), |(i, _)| i);
    format!("{}...", &text[..cut])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
