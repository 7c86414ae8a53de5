pub mod agent;
pub mod args;
pub mod assemble;
pub mod audio;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ffmpeg;
pub mod llm;
pub mod picker;
pub mod publish;
pub mod render;
pub mod retention;
pub mod retry;
pub mod scheduler;
pub mod script;
pub mod still;
pub mod topics;
pub mod tts;
pub mod utils;
