use std::sync::Arc;

use tracing::{info, warn};

use super::model::Script;
use super::parser::parse_script;
use crate::llm::{TextGenerator, script_prompt};
use crate::picker::Picker;

const INTRODUCTIONS: &[&str] = &[
    "Welcome to our tech channel! Today we're discussing: {topic}",
    "Hey tech enthusiasts! Let's explore {topic}",
    "In this video, we'll dive into {topic}",
];

const MAIN_POINTS: &[&str] = &[
    "First, let's understand the basics of {topic}",
    "Here are the key points you need to know",
    "The most important aspects include what changed recently and why it matters",
];

const CONCLUSIONS: &[&str] = &[
    "Thanks for watching! Don't forget to subscribe for more tech content.",
    "I hope you learned something new today. See you in the next video!",
    "If you found this helpful, please like and subscribe!",
];

const INTERSTITIALS: [&str; 2] = [
    "Key insights and practical tips",
    "Here is an example of how it works in practice",
];

const MIN_TEMPLATE_LENGTH: u32 = 30;
const MAX_TEMPLATE_LENGTH: u32 = 3600;

/// Turns a topic into a `Script`, preferring the generative backend and falling back to templates.
pub struct ScriptComposer {
    generator: Option<Arc<dyn TextGenerator>>,
    picker: Picker,
}

impl ScriptComposer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, picker: Picker) -> Self {
        Self { generator, picker }
    }

    pub fn template_only(picker: Picker) -> Self {
        Self::new(None, picker)
    }

    pub async fn compose(&mut self, topic: &str, target_length: u32) -> Script {
        if let Some(generator) = &self.generator {
            match generator.generate(&script_prompt(topic, target_length)).await {
                Ok(raw) if !raw.trim().is_empty() => {
                    info!("Generated script for topic: {}", topic);
                    return parse_script(&raw, topic);
                }
                Ok(_) => warn!("Text generator returned nothing; using template script"),
                Err(e) => warn!("Text generation failed ({}); using template script", e),
            }
        }

        let raw = self.template_script(topic, target_length);
        info!("Built template script for topic: {}", topic);
        parse_script(&raw, topic)
    }

    /// Timestamped template text spread across `target_length` seconds.
    pub fn template_script(&mut self, topic: &str, target_length: u32) -> String {
        let intro = self.pick_line(INTRODUCTIONS, topic);
        let main = self.pick_line(MAIN_POINTS, topic);
        let outro = self.pick_line(CONCLUSIONS, topic);

        let length = target_length.clamp(MIN_TEMPLATE_LENGTH, MAX_TEMPLATE_LENGTH);
        let marks = [0, 5, length * 2 / 5, length * 13 / 20, length - 10];
        let lines = [
            intro.as_str(),
            main.as_str(),
            INTERSTITIALS[0],
            INTERSTITIALS[1],
            outro.as_str(),
        ];

        marks
            .iter()
            .zip(lines)
            .map(|(mark, line)| format!("{}:{:02} - {}", mark / 60, mark % 60, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn pick_line(&mut self, pool: &[&str], topic: &str) -> String {
        self.picker
            .pick(pool)
            .unwrap_or(&"{topic}")
            .replace("{topic}", topic)
    }
}
