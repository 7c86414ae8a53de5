use thiserror::Error;

/// Failures from a text-to-speech backend.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("TTS backend rate limited the request: {0}")]
    RateLimited(String),

    #[error("TTS synthesis failed: {0}")]
    Failed(String),

    #[error("TTS produced no audio at {0}")]
    EmptyOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TtsError::RateLimited(_))
    }
}

/// Failures from the text-generation backend.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Failures while fetching or parsing a single feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed {url} contained no entries")]
    NoEntries { url: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid upload time '{0}', expected HH:MM")]
    InvalidUploadTime(String),

    #[error("Invalid upload schedule '{0}', expected daily, weekly or monthly")]
    InvalidCadence(String),

    #[error("Invalid delivery mode '{0}', expected local or transfer_sh")]
    InvalidDelivery(String),

    #[error("Invalid TTS backend '{0}', expected gtts or piper")]
    InvalidTtsBackend(String),
}
