use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use clipsmith::agent::{Backends, VideoAgent, run_automated};
use clipsmith::args::{Args, Mode};
use clipsmith::config::{Config, TtsBackend};
use clipsmith::ffmpeg::FfmpegEncoder;
use clipsmith::llm::{ChatCompletionGenerator, TextGenerator};
use clipsmith::tts::{GoogleTts, PiperTts, SpeechSynthesizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(topic) = &args.topic {
        config.default_topic = Some(topic.clone());
    }
    if let Some(length) = args.length {
        config.video_length = length;
    }

    let writes_files = args.mode.writes_files();
    init_tracing(&config, writes_files)?;
    info!("Starting clipsmith in {:?} mode", args.mode);
    if writes_files {
        config.ensure_dirs().context("Failed to create working directories")?;
    }

    let agent = VideoAgent::new(config.clone(), backends(&config));

    match args.mode {
        Mode::Status => {
            println!("{}", agent.status());
        }
        Mode::Create => match agent.create_video(args.topic.as_deref(), args.length).await {
            Some(path) => {
                println!("Video created: {}", path.display());
                println!("Follow the upload instructions next to it to publish.");
            }
            None => {
                error!("Failed to create video");
                std::process::exit(1);
            }
        },
        Mode::Automated => {
            run_automated(Arc::new(agent)).await?;
        }
    }

    info!("Process complete.");
    Ok(())
}

fn backends(config: &Config) -> Backends {
    let generator = config.llm.clone().map(|settings| {
        info!("Using {} for script generation", settings.model);
        Arc::new(ChatCompletionGenerator::new(settings)) as Arc<dyn TextGenerator>
    });
    if generator.is_none() {
        info!("No LLM_API_URL set, scripts come from templates");
    }

    let tts: Arc<dyn SpeechSynthesizer> = match config.tts_backend {
        TtsBackend::Gtts => Arc::new(GoogleTts::new(config.tts_lang.clone())),
        TtsBackend::Piper => Arc::new(PiperTts::new(config.piper_model.clone())),
    };

    Backends {
        generator,
        tts,
        encoder: Arc::new(FfmpegEncoder::default()),
    }
}

/// Logs to stdout; with `to_file`, also appends a plain-text copy to `<logs_dir>/clipsmith.log`.
fn init_tracing(config: &Config, to_file: bool) -> anyhow::Result<()> {
    let file_layer = if to_file {
        std::fs::create_dir_all(&config.logs_dir)?;
        let log_path = config.logs_dir.join("clipsmith.log");
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(log_file)),
        )
    } else {
        None
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(env_filter)
        .init();
    Ok(())
}
