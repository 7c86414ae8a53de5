use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::assemble::Assembler;
use crate::config::{Config, DeliveryMode};
use crate::delivery::{Deliverer, DeliveryManifest};
use crate::ffmpeg::MediaEncoder;
use crate::llm::TextGenerator;
use crate::picker::Picker;
use crate::publish::{self, VideoMetadata};
use crate::render::{BODY_BACKGROUND, CTA_BACKGROUND, HOOK_BACKGROUND, SegmentRenderer};
use crate::retention;
use crate::scheduler::{Cadence, Job, Scheduler};
use crate::script::{Script, ScriptComposer};
use crate::still::StillComposer;
use crate::topics::{FALLBACK_TOPICS, TopicSource};
use crate::tts::SpeechSynthesizer;

/// External capabilities the pipeline drives.
pub struct Backends {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub encoder: Arc<dyn MediaEncoder>,
}

/// Mutable per-run state; holding its lock also keeps pipeline runs from overlapping.
struct RunState {
    composer: ScriptComposer,
    picker: Picker,
}

pub struct VideoAgent {
    config: Config,
    topics: TopicSource,
    tts: Arc<dyn SpeechSynthesizer>,
    encoder: Arc<dyn MediaEncoder>,
    deliverer: Option<Deliverer>,
    state: Mutex<RunState>,
}

impl VideoAgent {
    pub fn new(config: Config, backends: Backends) -> Self {
        let topics = TopicSource::new(config.feeds.clone(), config.keywords.clone());
        let composer = ScriptComposer::new(backends.generator, Picker::new(config.random_seed));
        let picker = Picker::new(config.random_seed.map(|s| s.wrapping_add(1)));
        let deliverer = match config.delivery {
            DeliveryMode::TransferSh => Some(Deliverer::new(config.transfer_sh_url.clone())),
            DeliveryMode::Local => None,
        };
        Self {
            config,
            topics,
            tts: backends.tts,
            encoder: backends.encoder,
            deliverer,
            state: Mutex::new(RunState { composer, picker }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One full pipeline pass. Returns the finished video, or `None` when no video could be produced.
    pub async fn create_video(&self, topic: Option<&str>, length: Option<u32>) -> Option<PathBuf> {
        let mut state = self.state.lock().await;
        let length = length.unwrap_or(self.config.video_length);

        info!("Researching trending topics");
        let trending = self.topics.fetch_topics().await;
        let topic = match topic
            .map(str::to_string)
            .or_else(|| self.config.default_topic.clone())
        {
            Some(topic) => topic,
            None => state
                .picker
                .pick(&trending)
                .cloned()
                .unwrap_or_else(|| FALLBACK_TOPICS[0].to_string()),
        };
        info!("Selected topic: {}", topic);

        let script = state.composer.compose(&topic, length).await;
        info!(
            "Script ready: {} body segments, {}s",
            script.segments.len(),
            script.total_duration
        );

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (name, run_dir) =
            match claim_run_dir(&self.config.temp_dir, &self.config.output_dir, &stamp).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!("Cannot create work directory in {}: {}", self.config.temp_dir.display(), e);
                    return None;
                }
            };

        let output = self.config.output_dir.join(format!("video_{}.mp4", name));
        let produced = self.render_and_assemble(&script, &run_dir, &output).await;
        remove_dir_quietly(&run_dir).await;
        if !produced {
            error!("Video creation failed");
            return None;
        }
        info!("Video created: {}", output.display());

        let metadata = VideoMetadata::new(&topic, script, &output);
        if let Err(e) = publish::write_metadata(&output, &metadata) {
            warn!("{:#}", e);
        }
        let instructions =
            match publish::write_upload_instructions(&output, &metadata, self.config.upload_time) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("{:#}", e);
                    None
                }
            };

        if let Some(deliverer) = &self.deliverer {
            self.deliver(deliverer, &output, instructions.as_deref()).await;
        }

        if self.config.cleanup_old_files {
            retention::retain(&self.config.output_dir, self.config.keep_video_count);
        }

        info!("Video ready for manual upload: {}", output.display());
        Some(output)
    }

    async fn render_and_assemble(
        &self,
        script: &Script,
        run_dir: &Path,
        output: &Path,
    ) -> bool {
        let stills = StillComposer::new(self.config.width, self.config.height);
        let mut renderer = SegmentRenderer::new(
            Arc::clone(&self.tts),
            Arc::clone(&self.encoder),
            stills,
            run_dir,
        )
        .with_cooldown(self.config.tts_cooldown);

        let body = script.segments.iter().take(self.config.max_body_segments);
        if script.segments.len() > self.config.max_body_segments {
            info!(
                "Rendering {} of {} body segments",
                self.config.max_body_segments,
                script.segments.len()
            );
        }
        let plan = std::iter::once((&script.hook, HOOK_BACKGROUND))
            .chain(body.map(|s| (s, BODY_BACKGROUND)))
            .chain(std::iter::once((&script.call_to_action, CTA_BACKGROUND)));

        let mut clips = Vec::new();
        for (segment, background) in plan {
            match renderer.render(segment, background).await {
                Some(clip) => clips.push(clip),
                None => warn!("Skipping segment: {}", segment.text),
            }
        }

        Assembler::new(Arc::clone(&self.encoder), run_dir)
            .assemble(clips, output)
            .await
    }

    async fn deliver(&self, deliverer: &Deliverer, video: &Path, instructions: Option<&Path>) {
        info!("Delivering files via transfer.sh");
        let video_url = deliverer.deliver(video).await;
        let instructions_url = match instructions {
            Some(path) => deliverer.deliver(path).await,
            None => None,
        };

        let manifest = DeliveryManifest {
            video_file: video.to_path_buf(),
            video_url,
            instructions_file: instructions
                .map(Path::to_path_buf)
                .unwrap_or_else(|| publish::sibling_path(video, "_upload_instructions.txt")),
            instructions_url,
            created_at: Local::now(),
        };
        let manifest_path = publish::sibling_path(video, "_delivery.json");
        match manifest.write(&manifest_path) {
            Ok(()) => info!("Delivery manifest saved: {}", manifest_path.display()),
            Err(e) => warn!("{:#}", e),
        }
        if let Some(url) = &manifest.video_url {
            info!("Video download URL: {}", url);
        }
        if let Some(url) = &manifest.instructions_url {
            info!("Instructions download URL: {}", url);
        }
    }

    /// Reads the output directory; no side effects.
    pub fn status(&self) -> Status {
        let mut videos: Vec<(PathBuf, std::time::SystemTime)> = std::fs::read_dir(&self.config.output_dir)
            .into_iter()
            .flatten()
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("mp4")))
            .filter_map(|p| {
                let modified = p.metadata().and_then(|m| m.modified()).ok()?;
                Some((p, modified))
            })
            .collect();
        videos.sort_by(|a, b| b.1.cmp(&a.1));

        let now = Local::now().naive_local();
        Status {
            video_count: videos.len(),
            latest: videos.into_iter().next().map(|(p, _)| p),
            output_dir: self.config.output_dir.clone(),
            cadence: self.config.cadence,
            upload_time: self.config.upload_time,
            next_run: crate::scheduler::next_occurrence(self.config.upload_time, now),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Status {
    pub video_count: usize,
    pub latest: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub cadence: Cadence,
    pub upload_time: NaiveTime,
    pub next_run: NaiveDateTime,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Videos created: {} (in {})", self.video_count, self.output_dir.display())?;
        match &self.latest {
            Some(latest) => writeln!(f, "Latest video: {}", latest.display())?,
            None => writeln!(f, "Latest video: none")?,
        }
        writeln!(
            f,
            "Schedule: {} at {}",
            self.cadence,
            self.upload_time.format("%H:%M")
        )?;
        write!(f, "Next run: {}", self.next_run.format("%Y-%m-%d %H:%M"))
    }
}

/// Scheduler job that runs one pipeline pass.
pub struct CreateVideoJob {
    agent: Arc<VideoAgent>,
}

impl CreateVideoJob {
    pub fn new(agent: Arc<VideoAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Job for CreateVideoJob {
    fn name(&self) -> &str {
        "create_video"
    }

    async fn run(&self) {
        match self.agent.create_video(None, None).await {
            Some(path) => {
                info!("Video ready for manual upload: {}", path.display());
                info!("Next video will be created at the next scheduled time");
            }
            None => error!("Scheduled video creation failed"),
        }
    }
}

/// Schedules the pipeline, runs one pass right away, then polls until Ctrl-C.
pub async fn run_automated(agent: Arc<VideoAgent>) -> anyhow::Result<()> {
    let config = agent.config();
    let mut scheduler = Scheduler::new(config.cadence, config.upload_time);
    let job = Arc::new(CreateVideoJob::new(Arc::clone(&agent)));
    let next = scheduler.schedule(job.clone()).await;
    info!("Next scheduled run: {}", next);

    info!("Creating first video immediately");
    job.run().await;

    scheduler.start();
    info!("Automated mode running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.stop().await;
    Ok(())
}

/// Picks `stamp`, or `stamp_2`, `stamp_3`, ... when a video or work directory already uses it,
/// and creates the matching `run_<name>` directory.
async fn claim_run_dir(temp_dir: &Path, output_dir: &Path, stamp: &str) -> std::io::Result<(String, PathBuf)> {
    tokio::fs::create_dir_all(temp_dir).await?;
    let mut attempt = 1u32;
    loop {
        let name = if attempt == 1 {
            stamp.to_string()
        } else {
            format!("{}_{}", stamp, attempt)
        };
        attempt += 1;

        if output_dir.join(format!("video_{}.mp4", name)).exists() {
            continue;
        }
        let run_dir = temp_dir.join(format!("run_{}", name));
        match tokio::fs::create_dir(&run_dir).await {
            Ok(()) => return Ok((name, run_dir)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
}

async fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove work directory {}: {}", dir.display(), e);
        }
    }
}
