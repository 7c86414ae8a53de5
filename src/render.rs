use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::Rgb;
use tracing::{debug, error, info, warn};

use crate::audio::audio_duration_seconds;
use crate::ffmpeg::{ClipPlan, MediaEncoder};
use crate::retry::RetryPolicy;
use crate::script::Segment;
use crate::still::StillComposer;
use crate::tts::SpeechSynthesizer;
use crate::utils::preview;

pub const FADE_SECONDS: f64 = 0.3;

pub const HOOK_BACKGROUND: Rgb<u8> = Rgb([40, 60, 120]);
pub const BODY_BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
pub const CTA_BACKGROUND: Rgb<u8> = Rgb([120, 40, 60]);

/// One encoded segment and the temp files backing it.
#[derive(Debug, Clone)]
pub struct Clip {
    pub index: usize,
    pub path: PathBuf,
    pub duration: f64,
    pub narrated: bool,
    pub temp_files: Vec<PathBuf>,
}

pub struct SegmentRenderer {
    tts: Arc<dyn SpeechSynthesizer>,
    encoder: Arc<dyn MediaEncoder>,
    stills: StillComposer,
    retry: RetryPolicy,
    cooldown: Duration,
    work_dir: PathBuf,
    next_index: usize,
}

impl SegmentRenderer {
    pub fn new(
        tts: Arc<dyn SpeechSynthesizer>,
        encoder: Arc<dyn MediaEncoder>,
        stills: StillComposer,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tts,
            encoder,
            stills,
            retry: RetryPolicy::default(),
            cooldown: Duration::from_secs(1),
            work_dir: work_dir.into(),
            next_index: 0,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Renders one segment. `None` means the visual could not be produced and the segment should be skipped.
    pub async fn render(&mut self, segment: &Segment, background: Rgb<u8>) -> Option<Clip> {
        let index = self.next_index;
        self.next_index += 1;

        let mut temp_files = Vec::new();
        let narration = self.narrate(&segment.text, index, &mut temp_files).await;

        let (audio, duration) = match narration {
            Some(path) => match audio_duration_seconds(&path).await {
                Ok(seconds) => (Some(path), seconds),
                Err(e) => {
                    warn!("Audio load failed, using silent: {:#}", e);
                    (None, segment.duration as f64)
                }
            },
            None => {
                warn!("No narration, creating silent segment");
                (None, segment.duration as f64)
            }
        };

        let still = match self
            .stills
            .compose(&segment.text, background, &self.work_dir, index)
        {
            Ok(still) => still,
            Err(e) => {
                error!("Still composition failed for segment {}: {:#}", index, e);
                remove_quietly(&temp_files);
                return None;
            }
        };
        temp_files.extend(still.files());

        let clip_path = self.work_dir.join(format!("clip_{:03}.mp4", index));
        temp_files.push(clip_path.clone());
        let narrated = audio.is_some();
        let plan = ClipPlan {
            still,
            audio,
            duration,
            fade: FADE_SECONDS,
        };

        if let Err(e) = self.encoder.encode_clip(&plan, &clip_path).await {
            error!("Segment encode failed for segment {}: {:#}", index, e);
            remove_quietly(&temp_files);
            return None;
        }

        info!(
            "Segment {}: {} ({:.1}s{})",
            index,
            preview(&segment.text, 25),
            duration,
            if narrated { "" } else { ", silent" }
        );
        Some(Clip {
            index,
            path: clip_path,
            duration,
            narrated,
            temp_files,
        })
    }

    /// Synthesizes narration with rate-limit retries; `None` means proceed silently.
    async fn narrate(&self, text: &str, index: usize, temp_files: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let path = self
            .work_dir
            .join(format!("narration_{:03}.{}", index, self.tts.extension()));
        temp_files.push(path.clone());

        let tts = Arc::clone(&self.tts);
        let result = self
            .retry
            .run(
                "Narration synthesis",
                |e: &crate::error::TtsError| e.is_rate_limited(),
                |attempt| {
                    let tts = Arc::clone(&tts);
                    let path = path.clone();
                    async move {
                        debug!("Narration attempt {} for {}", attempt, path.display());
                        tts.synthesize(text, &path).await
                    }
                },
            )
            .await;

        match result {
            Ok(()) => {
                tokio::time::sleep(self.cooldown).await;
                Some(path)
            }
            Err(e) => {
                error!("Narration failed, continuing without audio: {}", e);
                None
            }
        }
    }
}

fn remove_quietly(paths: &[PathBuf]) {
    for path in paths {
        let _ = std::fs::remove_file(Path::new(path));
    }
}
