use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::still::{FontChoice, Still};

/// Everything needed to encode one segment clip.
#[derive(Debug, Clone)]
pub struct ClipPlan {
    pub still: Still,
    pub audio: Option<PathBuf>,
    pub duration: f64,
    pub fade: f64,
}

/// Encodes clips and joins them; implemented by ffmpeg in production.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn encode_clip(&self, plan: &ClipPlan, out: &Path) -> anyhow::Result<()>;

    /// Joins the clips listed in an ffmpeg concat list into `out`.
    async fn concat(&self, list_file: &Path, out: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    pub fps: u32,
    pub video_bitrate: String,
    pub preset: String,
    pub threads: u32,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            fps: 24,
            video_bitrate: "500k".to_string(),
            preset: "ultrafast".to_string(),
            threads: 1,
        }
    }
}

impl FfmpegEncoder {
    pub fn clip_args(&self, plan: &ClipPlan, out: &Path) -> Vec<String> {
        let duration = format!("{:.3}", plan.duration);
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            self.fps.to_string(),
            "-i".into(),
            plan.still.image_path.to_string_lossy().into_owned(),
        ];

        match &plan.audio {
            Some(audio) => {
                args.extend(["-i".into(), audio.to_string_lossy().into_owned()]);
            }
            None => {
                args.extend([
                    "-f".into(),
                    "lavfi".into(),
                    "-i".into(),
                    "anullsrc=r=44100:cl=stereo".into(),
                ]);
            }
        }

        args.extend([
            "-t".into(),
            duration,
            "-vf".into(),
            video_filter(&plan.still, plan.duration, plan.fade),
            "-af".into(),
            "apad".into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.preset.clone(),
            "-b:v".into(),
            self.video_bitrate.clone(),
            "-r".into(),
            self.fps.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-ar".into(),
            "44100".into(),
            "-ac".into(),
            "2".into(),
            "-threads".into(),
            self.threads.to_string(),
            out.to_string_lossy().into_owned(),
        ]);
        args
    }

    pub fn concat_args(&self, list_file: &Path, out: &Path, copy: bool) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.to_string_lossy().into_owned(),
        ];
        if copy {
            args.extend(["-c".into(), "copy".into()]);
        } else {
            args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                self.preset.clone(),
                "-b:v".into(),
                self.video_bitrate.clone(),
                "-r".into(),
                self.fps.to_string(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-c:a".into(),
                "aac".into(),
                "-threads".into(),
                self.threads.to_string(),
            ]);
        }
        args.extend([
            "-movflags".into(),
            "+faststart".into(),
            out.to_string_lossy().into_owned(),
        ]);
        args
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn encode_clip(&self, plan: &ClipPlan, out: &Path) -> anyhow::Result<()> {
        run_ffmpeg(&self.clip_args(plan, out)).await
    }

    async fn concat(&self, list_file: &Path, out: &Path) -> anyhow::Result<()> {
        info!("Concatenating clips into {}", out.display());
        if run_ffmpeg(&self.concat_args(list_file, out, true)).await.is_ok() {
            return Ok(());
        }
        warn!("ffmpeg concat with copy failed; retrying with re-encode");
        run_ffmpeg(&self.concat_args(list_file, out, false)).await
    }
}

async fn run_ffmpeg(args: &[String]) -> anyhow::Result<()> {
    debug!("ffmpeg {}", args.join(" "));
    let output = Command::new("ffmpeg").args(args).output().await?;
    if !output.status.success() {
        anyhow::bail!(
            "ffmpeg exited with status {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// One centred drawtext per line, then the fades.
pub fn video_filter(still: &Still, duration: f64, fade: f64) -> String {
    let font = match &still.font {
        FontChoice::File(path) => format!("fontfile='{}'", escape_ffmpeg_path(path)),
        FontChoice::Family(family) => format!("font='{}'", family),
    };

    let mut filters: Vec<String> = still
        .lines
        .iter()
        .map(|line| {
            format!(
                "drawtext={font}:textfile='{path}':expansion=none:fontsize={size}:fontcolor=white:x=(w-text_w)/2:y={y}",
                font = font,
                path = escape_ffmpeg_path(&line.text_path),
                size = still.font_size,
                y = line.y,
            )
        })
        .collect();

    let fade_out_start = (duration - fade).max(0.0);
    filters.push(format!("fade=t=in:st=0:d={:.2}", fade));
    filters.push(format!("fade=t=out:st={:.3}:d={:.2}", fade_out_start, fade));
    filters.push("format=yuv420p".to_string());
    filters.join(",")
}

/// Body of an ffmpeg concat-demuxer list for `clips`, in order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}
