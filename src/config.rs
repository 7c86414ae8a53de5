use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use tracing::info;

use crate::error::ConfigError;
use crate::scheduler::Cadence;

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.feedburner.com/oreilly/radar",
    "https://techcrunch.com/feed/",
    "https://www.wired.com/feed/rss",
    "https://feeds.arstechnica.com/arstechnica/index",
    "https://www.theverge.com/rss/index.xml",
    "https://www.reddit.com/r/technology/.rss",
    "https://www.reddit.com/r/programming/.rss",
];

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "ml",
    "python",
    "programming",
    "coding",
    "software",
    "technology",
    "tech",
    "startup",
    "innovation",
    "blockchain",
    "crypto",
    "cybersecurity",
    "cloud",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Local,
    TransferSh,
}

impl DeliveryMode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(DeliveryMode::Local),
            "transfer_sh" | "transfer.sh" => Ok(DeliveryMode::TransferSh),
            other => Err(ConfigError::InvalidDelivery(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsBackend {
    Gtts,
    Piper,
}

impl TtsBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "gtts" | "google" => Ok(TtsBackend::Gtts),
            "piper" => Ok(TtsBackend::Piper),
            other => Err(ConfigError::InvalidTtsBackend(other.to_string())),
        }
    }
}

/// Settings for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub upload_time: NaiveTime,
    pub cadence: Cadence,
    pub default_topic: Option<String>,
    pub video_length: u32,

    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub logs_dir: PathBuf,

    pub keep_video_count: usize,
    pub cleanup_old_files: bool,

    pub delivery: DeliveryMode,
    pub transfer_sh_url: String,

    pub llm: Option<LlmSettings>,

    pub tts_backend: TtsBackend,
    pub tts_lang: String,
    pub piper_model: String,
    pub tts_cooldown: Duration,

    pub max_body_segments: usize,
    pub random_seed: Option<u64>,
    pub log_level: String,

    pub feeds: Vec<String>,
    pub keywords: Vec<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            cadence: Cadence::Daily,
            default_topic: None,
            video_length: 60,
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from("temp"),
            logs_dir: PathBuf::from("logs"),
            keep_video_count: 5,
            cleanup_old_files: true,
            delivery: DeliveryMode::Local,
            transfer_sh_url: "https://transfer.sh".to_string(),
            llm: None,
            tts_backend: TtsBackend::Gtts,
            tts_lang: "en".to_string(),
            piper_model: "./tts/en_US-amy-medium.onnx".to_string(),
            tts_cooldown: Duration::from_secs(1),
            max_body_segments: 2,
            random_seed: None,
            log_level: "info".to_string(),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            width: 1280,
            height: 720,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let flag = |key: &str, default: bool| {
            get(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };
        let path = |key: &str, default: &PathBuf| get(key).map(PathBuf::from).unwrap_or_else(|| default.clone());

        let upload_time = match get("VIDEO_UPLOAD_TIME") {
            Some(value) => parse_upload_time(&value)?,
            None => defaults.upload_time,
        };
        let cadence = match get("UPLOAD_SCHEDULE") {
            Some(value) => Cadence::parse(&value)?,
            None => defaults.cadence,
        };
        let delivery = match get("OUTPUT_DELIVERY") {
            Some(value) => DeliveryMode::parse(&value)?,
            None => defaults.delivery,
        };
        let tts_backend = match get("TTS_BACKEND") {
            Some(value) => TtsBackend::parse(&value)?,
            None => defaults.tts_backend,
        };

        let llm = get("LLM_API_URL").map(|api_url| LlmSettings {
            api_url,
            api_key: get("LLM_API_KEY").unwrap_or_default(),
            model: get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            temperature: get("LLM_TEMPERATURE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0.7),
        });

        Ok(Self {
            upload_time,
            cadence,
            default_topic: get("VIDEO_TOPIC").map(|t| t.trim().to_string()),
            video_length: number("VIDEO_LENGTH", defaults.video_length as u64) as u32,
            output_dir: path("OUTPUT_DIR", &defaults.output_dir),
            temp_dir: path("TEMP_DIR", &defaults.temp_dir),
            logs_dir: path("LOGS_DIR", &defaults.logs_dir),
            keep_video_count: number("KEEP_VIDEO_COUNT", defaults.keep_video_count as u64)
                as usize,
            cleanup_old_files: flag("CLEANUP_OLD_FILES", defaults.cleanup_old_files),
            delivery,
            transfer_sh_url: get("TRANSFER_SH_URL").unwrap_or(defaults.transfer_sh_url),
            llm,
            tts_backend,
            tts_lang: get("TTS_LANG").unwrap_or(defaults.tts_lang),
            piper_model: get("PIPER_MODEL").unwrap_or(defaults.piper_model),
            tts_cooldown: defaults.tts_cooldown,
            max_body_segments: number("MAX_BODY_SEGMENTS", defaults.max_body_segments as u64)
                as usize,
            random_seed: get("RANDOM_SEED").and_then(|v| v.trim().parse().ok()),
            log_level: get("LOG_LEVEL")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or(defaults.log_level),
            feeds: defaults.feeds,
            keywords: defaults.keywords,
            width: defaults.width,
            height: defaults.height,
        })
    }

    /// Creates the output, temp and logs directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.output_dir, &self.temp_dir, &self.logs_dir] {
            fs::create_dir_all(dir)?;
        }
        info!(
            "Video settings: {}s {} at {}",
            self.video_length,
            self.cadence,
            self.upload_time.format("%H:%M")
        );
        info!(
            "Cleanup: {} (keep {} videos)",
            self.cleanup_old_files, self.keep_video_count
        );
        Ok(())
    }
}

pub fn parse_upload_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidUploadTime(value.to_string()))
}
