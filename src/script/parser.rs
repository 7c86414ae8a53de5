use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::model::{FALLBACK_TOTAL_DURATION, Script, Segment};

pub const TIMED_SEGMENT_DURATION: u32 = 10;
pub const UNTIMED_SEGMENT_DURATION: u32 = 8;

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d+)$").expect("valid timestamp regex"));

/// Parses free-form script text into a `Script`. Never fails: missing parts fall back to defaults.
pub fn parse_script(raw: &str, topic: &str) -> Script {
    let mut segments = Vec::new();
    let mut current_time: u32 = 0;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_bare_timestamp(line) {
            debug!("Skipping timestamp without text: '{}'", line);
            continue;
        }

        if let Some((stamp, text)) = split_timed_line(line) {
            match parse_timestamp(stamp) {
                Some(seconds) => current_time = seconds,
                None => {
                    debug!("Unparseable timestamp '{}', advancing clock", stamp);
                    current_time = current_time.saturating_add(TIMED_SEGMENT_DURATION);
                }
            }
            segments.push(Segment::new(text, current_time, TIMED_SEGMENT_DURATION));
        } else {
            segments.push(Segment::new(line, current_time, UNTIMED_SEGMENT_DURATION));
            current_time = current_time.saturating_add(UNTIMED_SEGMENT_DURATION);
        }
    }

    debug!("Parsed {} script segments", segments.len());
    assemble_script(segments, topic)
}

/// `"0:05 - text"` → `("0:05", "text")` for lines that look timestamped.
fn split_timed_line(line: &str) -> Option<(&str, &str)> {
    let starts_with_digit = line.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !starts_with_digit || !line.contains(':') {
        return None;
    }
    let (stamp, text) = line.split_once(" - ")?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some((stamp.trim(), text))
}

/// `"0:00 -"` and friends: a timestamp with nothing to narrate.
fn is_bare_timestamp(line: &str) -> bool {
    let stamp = line.trim_end_matches(|c: char| c == '-' || c.is_whitespace());
    TIMESTAMP_RE.is_match(stamp)
}

fn parse_timestamp(stamp: &str) -> Option<u32> {
    let caps = TIMESTAMP_RE.captures(stamp)?;
    let minutes: u32 = caps[1].parse().ok()?;
    let seconds: u32 = caps[2].parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

fn assemble_script(mut segments: Vec<Segment>, topic: &str) -> Script {
    let total_duration = if segments.is_empty() {
        FALLBACK_TOTAL_DURATION
    } else {
        segments.iter().map(|s| s.duration).sum()
    };

    let (hook, body, call_to_action) = match segments.len() {
        0 => (Script::default_hook(topic), Vec::new(), Script::default_call_to_action()),
        1 => {
            let only = segments.remove(0);
            (only.clone(), Vec::new(), only)
        }
        _ => {
            let call_to_action = segments.pop().unwrap_or_else(Script::default_call_to_action);
            let hook = segments.remove(0);
            (hook, segments, call_to_action)
        }
    };

    Script {
        title: topic.to_string(),
        hook,
        segments: body,
        call_to_action,
        total_duration,
    }
}
