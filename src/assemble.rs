use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::ffmpeg::{MediaEncoder, concat_list};
use crate::render::Clip;

pub const CONCAT_LIST_NAME: &str = "files.txt";

/// Joins rendered clips into the final video.
pub struct Assembler {
    encoder: Arc<dyn MediaEncoder>,
    work_dir: PathBuf,
}

impl Assembler {
    pub fn new(encoder: Arc<dyn MediaEncoder>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            work_dir: work_dir.into(),
        }
    }

    /// Concatenates `clips` in order into `output`. Temp files are removed whatever the outcome.
    pub async fn assemble(&self, clips: Vec<Clip>, output: &Path) -> bool {
        if clips.is_empty() {
            error!("No clips to assemble");
            return false;
        }

        let list_file = self.work_dir.join(CONCAT_LIST_NAME);
        let paths: Vec<PathBuf> = clips
            .iter()
            .map(|c| std::path::absolute(&c.path).unwrap_or_else(|_| c.path.clone()))
            .collect();

        let ok = match tokio::fs::write(&list_file, concat_list(&paths)).await {
            Ok(()) => match self.encoder.concat(&list_file, output).await {
                Ok(()) => {
                    let total: f64 = clips.iter().map(|c| c.duration).sum();
                    info!(
                        "Assembled {} clips ({:.1}s) into {}",
                        clips.len(),
                        total,
                        output.display()
                    );
                    true
                }
                Err(e) => {
                    error!("Video assembly failed: {:#}", e);
                    false
                }
            },
            Err(e) => {
                error!("Failed to write {}: {}", list_file.display(), e);
                false
            }
        };

        let mut leftovers: Vec<&Path> = clips
            .iter()
            .flat_map(|c| c.temp_files.iter().map(PathBuf::as_path))
            .collect();
        leftovers.push(&list_file);
        for path in leftovers {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Could not remove temp file {}: {}", path.display(), e);
                }
            }
        }

        ok
    }
}
