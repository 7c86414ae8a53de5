use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use clipsmith::agent::{Backends, VideoAgent};
use clipsmith::config::{Config, DeliveryMode};
use clipsmith::error::{LlmError, TtsError};
use clipsmith::ffmpeg::{ClipPlan, MediaEncoder};
use clipsmith::llm::TextGenerator;
use clipsmith::publish::VideoMetadata;
use clipsmith::script::VisualCue;
use clipsmith::tts::SpeechSynthesizer;

/// Writes one second of silence as WAV so durations come from hound.
struct SilentTts;

#[async_trait]
impl SpeechSynthesizer for SilentTts {
    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, _text: &str, out_path: &Path) -> Result<(), TtsError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(out_path, spec).map_err(|e| TtsError::Failed(e.to_string()))?;
        for _ in 0..8000 {
            writer
                .write_sample(0i16)
                .map_err(|e| TtsError::Failed(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| TtsError::Failed(e.to_string()))?;
        Ok(())
    }
}

/// Records what it was asked to encode and writes placeholder files.
#[derive(Default)]
struct FakeEncoder {
    clip_texts: Mutex<Vec<String>>,
    concat_lists: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    async fn encode_clip(&self, plan: &ClipPlan, out: &Path) -> anyhow::Result<()> {
        let text = plan
            .still
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.clip_texts.lock().unwrap().push(text);
        fs::write(out, b"clip")?;
        Ok(())
    }

    async fn concat(&self, list_file: &Path, out: &Path) -> anyhow::Result<()> {
        self.concat_lists
            .lock()
            .unwrap()
            .push(fs::read_to_string(list_file)?);
        fs::write(out, b"final video")?;
        Ok(())
    }
}

struct CannedGenerator(&'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

fn config(dir: &TempDir) -> Config {
    let config = Config {
        output_dir: dir.path().join("output"),
        temp_dir: dir.path().join("temp"),
        logs_dir: dir.path().join("logs"),
        feeds: Vec::new(),
        tts_cooldown: Duration::ZERO,
        random_seed: Some(42),
        ..Config::default()
    };
    config.ensure_dirs().unwrap();
    config
}

fn agent(config: Config, generator: Option<Arc<dyn TextGenerator>>, encoder: Arc<FakeEncoder>) -> VideoAgent {
    VideoAgent::new(
        config,
        Backends {
            generator,
            tts: Arc::new(SilentTts),
            encoder,
        },
    )
}

#[tokio::test]
async fn template_run_produces_video_and_upload_files() {
    let dir = TempDir::new().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let agent = agent(config(&dir), None, encoder.clone());

    let video = agent
        .create_video(Some("AI trends 2024"), Some(60))
        .await
        .expect("video");

    assert!(video.exists());
    let name = video.file_stem().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("video_"));

    let metadata: VideoMetadata = serde_json::from_str(
        &fs::read_to_string(video.with_file_name(format!("{}_metadata.json", name))).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata.topic, "AI trends 2024");
    assert!(!metadata.script.segments.is_empty());
    assert!(
        metadata
            .script
            .all_segments()
            .all(|s| VisualCue::ALL.contains(&s.visual_cue))
    );
    assert!(
        video
            .with_file_name(format!("{}_upload_instructions.txt", name))
            .exists()
    );

    // hook, two capped body segments, call to action
    let lists = encoder.concat_lists.lock().unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].lines().count(), 4);

    // temp work is gone
    assert_eq!(fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
}

#[tokio::test]
async fn hook_and_call_to_action_only_yield_two_clips_in_order() {
    let dir = TempDir::new().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let generator: Arc<dyn TextGenerator> =
        Arc::new(CannedGenerator("0:00 - Hello builders\n0:10 - Subscribe for more"));
    let agent = agent(config(&dir), Some(generator), encoder.clone());

    agent
        .create_video(Some("Rust"), Some(30))
        .await
        .expect("video");

    assert_eq!(
        *encoder.clip_texts.lock().unwrap(),
        vec!["Hello builders".to_string(), "Subscribe for more".to_string()]
    );
    let lists = encoder.concat_lists.lock().unwrap();
    let entries: Vec<&str> = lists[0].lines().collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].contains("clip_000.mp4"));
    assert!(entries[1].contains("clip_001.mp4"));
}

#[tokio::test]
async fn old_videos_are_pruned_after_a_run() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        keep_video_count: 2,
        ..config(&dir)
    };
    for (i, age) in [30u64, 20, 10].iter().enumerate() {
        let path = config.output_dir.join(format!("video_old_{}.mp4", i));
        fs::File::create(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(age * 60))
            .unwrap();
    }
    let agent = agent(config.clone(), None, Arc::new(FakeEncoder::default()));

    let video = agent.create_video(Some("Cloud"), Some(30)).await.unwrap();

    assert!(video.exists());
    assert!(config.output_dir.join("video_old_2.mp4").exists());
    assert!(!config.output_dir.join("video_old_1.mp4").exists());
    assert!(!config.output_dir.join("video_old_0.mp4").exists());
    assert_eq!(agent.status().video_count, 2);
}

#[tokio::test]
async fn transfer_delivery_writes_manifest() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://share.example/abc\n"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = Config {
        delivery: DeliveryMode::TransferSh,
        transfer_sh_url: server.uri(),
        ..config(&dir)
    };
    let agent = agent(config, None, Arc::new(FakeEncoder::default()));

    let video = agent.create_video(Some("Edge AI"), Some(30)).await.unwrap();
    let name = video.file_stem().unwrap().to_string_lossy().into_owned();
    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(video.with_file_name(format!("{}_delivery.json", name))).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["video_url"], "https://share.example/abc");
    assert_eq!(manifest["instructions_url"], "https://share.example/abc");
}

#[tokio::test]
async fn back_to_back_runs_keep_both_videos() {
    let dir = TempDir::new().unwrap();
    let agent = agent(config(&dir), None, Arc::new(FakeEncoder::default()));

    let first = agent.create_video(Some("Rust"), Some(30)).await.unwrap();
    let second = agent.create_video(Some("Rust"), Some(30)).await.unwrap();

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
    let second_name = second.file_stem().unwrap().to_string_lossy().into_owned();
    assert!(
        second
            .with_file_name(format!("{}_metadata.json", second_name))
            .exists()
    );
    assert_eq!(agent.status().video_count, 2);
}
