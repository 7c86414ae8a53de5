use std::path::Path;

use anyhow::Context;
use hound::WavReader;
use tokio::process::Command;

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

pub async fn probe_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<f64>()
        .context("Failed to parse ffprobe duration")
}

/// Length of an audio file: WAV headers are read directly, everything else goes through ffprobe.
pub async fn audio_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    let duration = if is_wav {
        wav_duration_seconds(path)?
    } else {
        probe_duration_seconds(path).await?
    };
    if !(duration.is_finite() && duration > 0.0) {
        anyhow::bail!("{} has no playable audio", path.display());
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_wav(path: &Path, seconds: f64, channels: u16) {
        let spec = WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let frames = (seconds * 22050.0) as usize;
        for _ in 0..frames * channels as usize {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_duration_accounts_for_channels() {
        let dir = TempDir::new().unwrap();
        let mono = dir.path().join("mono.wav");
        let stereo = dir.path().join("stereo.wav");
        write_wav(&mono, 1.5, 1);
        write_wav(&stereo, 1.5, 2);

        assert!((wav_duration_seconds(&mono).unwrap() - 1.5).abs() < 1e-3);
        assert!((wav_duration_seconds(&stereo).unwrap() - 1.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn wav_files_skip_ffprobe() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narration_000.WAV");
        write_wav(&path, 0.5, 1);
        let duration = audio_duration_seconds(&path).await.unwrap();
        assert!((duration - 0.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn empty_wav_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silent.wav");
        write_wav(&path, 0.0, 1);
        assert!(audio_duration_seconds(&path).await.is_err());
    }
}
