use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Per-video files that share the video's stem.
pub const SIBLING_SUFFIXES: &[&str] = &[
    "_metadata.json",
    "_upload_instructions.txt",
    "_delivery.json",
    ".json",
];

/// Keeps the `keep` newest videos in `dir` and deletes the rest along with their siblings.
/// Returns how many videos were removed.
pub fn retain(dir: &Path, keep: usize) -> usize {
    let mut videos = match list_videos(dir) {
        Ok(videos) => videos,
        Err(e) => {
            warn!("Cannot list {} for cleanup: {}", dir.display(), e);
            return 0;
        }
    };
    videos.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (video, _) in videos.into_iter().skip(keep) {
        match fs::remove_file(&video) {
            Ok(()) => {
                removed += 1;
                info!("Removed old video {}", video.display());
            }
            Err(e) => {
                warn!("Failed to remove {}: {}", video.display(), e);
                continue;
            }
        }
        for sibling in siblings(&video) {
            match fs::remove_file(&sibling) {
                Ok(()) => debug!("Removed {}", sibling.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", sibling.display(), e),
            }
        }
    }

    if removed > 0 {
        info!("Cleanup removed {} old videos", removed);
    }
    removed
}

fn list_videos(dir: &Path) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !is_video(&path) {
            continue;
        }
        match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => videos.push((path, modified)),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(videos)
}

pub fn is_video(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
}

fn siblings(video: &Path) -> Vec<PathBuf> {
    let Some(stem) = video.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let dir = video.parent().unwrap_or_else(|| Path::new(""));
    SIBLING_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{}{}", stem, suffix)))
        .collect()
}
