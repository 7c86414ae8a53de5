use serde::{Deserialize, Serialize};

pub const DEFAULT_HOOK_DURATION: u32 = 5;
pub const DEFAULT_CTA_TEXT: &str = "Thanks for watching!";
pub const FALLBACK_TOTAL_DURATION: u32 = 60;

/// On-screen treatment chosen for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualCue {
    AnimatedText,
    CodeExample,
    HighlightText,
    CallToAction,
    SimpleText,
}

const CUE_GROUPS: &[(VisualCue, &[&str])] = &[
    (
        VisualCue::AnimatedText,
        &["introduce", "introducing", "welcome", "hey", "hello", "hi"],
    ),
    (
        VisualCue::CodeExample,
        &["show", "shows", "demonstrate", "demo", "example", "examples"],
    ),
    (
        VisualCue::HighlightText,
        &["tip", "tips", "trick", "tricks", "secret", "secrets"],
    ),
    (VisualCue::CallToAction, &["subscribe", "like", "follow"]),
];

/// Endings a keyword may carry and still count as a hit ("showing", "subscribers").
const INFLECTIONS: &[&str] = &["s", "es", "d", "ed", "ing", "r", "rs", "er", "ers"];

/// Keywords shorter than this only match exactly, so "hi" never hits "his".
const MIN_INFLECTED_KEYWORD: usize = 4;

fn keyword_hit(word: &str, keyword: &str) -> bool {
    match word.strip_prefix(keyword) {
        Some("") => true,
        Some(rest) => keyword.len() >= MIN_INFLECTED_KEYWORD && INFLECTIONS.contains(&rest),
        None => false,
    }
}

impl VisualCue {
    pub const ALL: [VisualCue; 5] = [
        VisualCue::AnimatedText,
        VisualCue::CodeExample,
        VisualCue::HighlightText,
        VisualCue::CallToAction,
        VisualCue::SimpleText,
    ];

    /// First keyword group with a word hit wins; no hit is `SimpleText`.
    pub fn for_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();

        CUE_GROUPS
            .iter()
            .find(|(_, keywords)| {
                words
                    .iter()
                    .any(|w| keywords.iter().any(|k| keyword_hit(w, k)))
            })
            .map(|(cue, _)| *cue)
            .unwrap_or(VisualCue::SimpleText)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualCue::AnimatedText => "animated_text",
            VisualCue::CodeExample => "code_example",
            VisualCue::HighlightText => "highlight_text",
            VisualCue::CallToAction => "call_to_action",
            VisualCue::SimpleText => "simple_text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Offset in seconds where the segment starts in the script.
    pub timestamp: u32,
    pub duration: u32,
    pub visual_cue: VisualCue,
}

impl Segment {
    pub fn new(text: impl Into<String>, timestamp: u32, duration: u32) -> Self {
        let text = text.into();
        let visual_cue = VisualCue::for_text(&text);
        Self {
            text,
            timestamp,
            duration,
            visual_cue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub hook: Segment,
    pub segments: Vec<Segment>,
    pub call_to_action: Segment,
    pub total_duration: u32,
}

impl Script {
    pub fn default_hook(topic: &str) -> Segment {
        Segment::new(topic, 0, DEFAULT_HOOK_DURATION)
    }

    pub fn default_call_to_action() -> Segment {
        Segment::new(DEFAULT_CTA_TEXT, 0, DEFAULT_HOOK_DURATION)
    }

    /// Hook, body segments and call-to-action in playback order.
    pub fn all_segments(&self) -> impl Iterator<Item = &Segment> {
        std::iter::once(&self.hook)
            .chain(self.segments.iter())
            .chain(std::iter::once(&self.call_to_action))
    }
}
