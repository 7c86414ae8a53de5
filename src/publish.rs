use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::script::Script;

pub const BASE_TAGS: &[&str] = &["technology", "tech", "programming", "coding", "tutorial"];
const MAX_KEYWORDS: usize = 5;

/// Everything needed to fill in the upload form by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub topic: String,
    pub description: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub script: Script,
    pub video_file: PathBuf,
    pub created_at: DateTime<Local>,
}

impl VideoMetadata {
    pub fn new(topic: &str, script: Script, video_file: &Path) -> Self {
        Self {
            title: topic.to_string(),
            topic: topic.to_string(),
            description: generate_description(topic),
            tags: generate_tags(topic),
            keywords: extract_keywords(topic),
            script,
            video_file: video_file.to_path_buf(),
            created_at: Local::now(),
        }
    }
}

/// Lowercased topic words longer than three characters, punctuation trimmed, at most five.
pub fn extract_keywords(topic: &str) -> Vec<String> {
    topic
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.trim_matches(['.', ',', '!', '?']).to_string())
        .filter(|w| !w.is_empty())
        .take(MAX_KEYWORDS)
        .collect()
}

pub fn generate_tags(topic: &str) -> Vec<String> {
    BASE_TAGS
        .iter()
        .map(|t| t.to_string())
        .chain(extract_keywords(topic))
        .collect()
}

pub fn generate_description(topic: &str) -> String {
    format!(
        "In this video, we explore {topic}. We cover key concepts and practical insights.\n\n\
         🎯 Key Topics Covered:\n\
         • {topic}\n\
         • Technology insights\n\
         • Practical applications\n\n\
         🔔 Don't forget to subscribe for more tech content!\n\
         💬 Let us know your thoughts in the comments.\n\n\
         #technology #tech #programming #coding #tutorial"
    )
}

/// `<dir>/<stem><suffix>` for a video path.
pub fn sibling_path(video: &Path, suffix: &str) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{}{}", stem, suffix))
}

pub fn write_metadata(video: &Path, metadata: &VideoMetadata) -> anyhow::Result<PathBuf> {
    let path = sibling_path(video, "_metadata.json");
    let data = serde_json::to_string_pretty(metadata)?;
    std::fs::write(&path, data)
        .with_context(|| format!("Failed to write metadata {}", path.display()))?;
    info!("Metadata saved: {}", path.display());
    Ok(path)
}

pub fn upload_instructions(video: &Path, metadata: &VideoMetadata, upload_time: NaiveTime) -> String {
    let file_name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "🎬 VIDEO READY FOR UPLOAD!

📁 Video File: {video}
📋 Metadata File: {metadata_file}

📤 UPLOAD INSTRUCTIONS:

1. Go to YouTube Studio (studio.youtube.com)
2. Click \"Create\" → \"Upload videos\"
3. Select the video file: {file_name}

📋 COPY-PASTE THIS INFORMATION:

📝 Title: {title}

📝 Description:
{description}

🏷️ Tags: {tags}

🔍 Keywords: {keywords}

⚙️ UPLOAD SETTINGS:
- Visibility: Public (or schedule as desired)
- Category: Science & Technology
- Made for kids: No
- License: Standard YouTube License

⏰ SCHEDULE RECOMMENDATION:
Upload at {upload_time} for best engagement

📊 AFTER UPLOAD:
1. Add to relevant playlists
2. Create a custom thumbnail
3. Add end screens and cards
4. Share on social media

🔄 AUTOMATION NOTE:
This video was generated automatically.
Next video will be generated and prepared for upload soon!

---
Generated at: {generated_at}",
        video = video.display(),
        metadata_file = sibling_path(video, "_metadata.json").display(),
        file_name = file_name,
        title = metadata.title,
        description = metadata.description,
        tags = metadata.tags.join(", "),
        keywords = metadata.keywords.join(", "),
        upload_time = upload_time.format("%H:%M"),
        generated_at = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

pub fn write_upload_instructions(
    video: &Path,
    metadata: &VideoMetadata,
    upload_time: NaiveTime,
) -> anyhow::Result<PathBuf> {
    let path = sibling_path(video, "_upload_instructions.txt");
    std::fs::write(&path, upload_instructions(video, metadata, upload_time))
        .with_context(|| format!("Failed to write upload instructions {}", path.display()))?;
    info!("Upload instructions saved: {}", path.display());
    Ok(path)
}
