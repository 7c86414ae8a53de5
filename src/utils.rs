use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^.!?]+[.!?]+)|([^.!?]+$)").expect("valid sentence regex"));

/// Groups sentences into chunks of at most `max_chars`; sentences longer than that are split on words.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    for m in SENTENCE_RE.find_iter(text) {
        let s = m.as_str().trim();
        if s.is_empty() {
            continue;
        }
        if s.chars().count() > max_chars {
            sentences.extend(wrap_text(s, max_chars));
        } else {
            sentences.push(s.to_string());
        }
    }
    if sentences.is_empty() {
        if !text.trim().is_empty() {
            warn!("No sentence breaks found; returning whole text as one chunk");
            return vec![text.trim().to_string()];
        }
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for s in sentences {
        if current.is_empty() {
            current.push_str(&s);
        } else if current.chars().count() + 1 + s.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&s);
        } else {
            chunks.push(current);
            current = s;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Greedy word wrap. Words longer than `width` are hard-broken into `width`-sized pieces.
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace().flat_map(|w| split_long_word(w, width)) {
        let word = word.as_str();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_long_word(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// First `max` characters of `s` for log previews.
pub fn preview(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}
