use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::USER_AGENT;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::TtsError;
use crate::utils::chunk_text;

/// Google Translate's TTS endpoint rejects requests longer than this.
const GTTS_MAX_CHARS: usize = 100;
const GTTS_URL: &str = "https://translate.google.com/translate_tts";

/// Text-to-speech backend writing narration audio to a file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// File extension of the audio this backend produces.
    fn extension(&self) -> &'static str;

    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<(), TtsError>;
}

/// The free Google Translate TTS endpoint, as used by gTTS.
pub struct GoogleTts {
    client: reqwest::Client,
    base_url: String,
    lang: String,
}

impl GoogleTts {
    pub fn new(lang: impl Into<String>) -> Self {
        Self::with_base_url(GTTS_URL, lang)
    }

    pub fn with_base_url(base_url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            lang: lang.into(),
        }
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>, TtsError> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header(USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64) clipsmith/0.1")
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.lang.as_str()),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TtsError::Failed(e.to_string()))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(TtsError::RateLimited(format!(
                "429 Too Many Requests from {}",
                self.base_url
            ))),
            status if !status.is_success() => {
                Err(TtsError::Failed(format!("HTTP {} from {}", status, self.base_url)))
            }
            _ => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| TtsError::Failed(e.to_string())),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    fn extension(&self) -> &'static str {
        "mp3"
    }

    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<(), TtsError> {
        let chunks = chunk_text(text, GTTS_MAX_CHARS);
        if chunks.is_empty() {
            return Err(TtsError::Failed("nothing to synthesize".to_string()));
        }

        // MP3 frames from consecutive responses can be concatenated as-is.
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!("gTTS chunk {}/{}: {}", idx + 1, chunks.len(), chunk);
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len()).await?);
        }
        if audio.is_empty() {
            return Err(TtsError::EmptyOutput(out_path.display().to_string()));
        }

        tokio::fs::write(out_path, &audio).await?;
        info!(
            "Audio: {}",
            out_path.file_name().unwrap_or_default().to_string_lossy()
        );
        Ok(())
    }
}

/// Local Piper voice, fed through stdin.
pub struct PiperTts {
    model: String,
}

impl PiperTts {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperTts {
    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<(), TtsError> {
        let mut child = Command::new("piper")
            .arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| TtsError::Failed(format!("failed to spawn piper: {}", e)))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| TtsError::Failed("failed to open piper stdin".to_string()))?;
            stdin.write_all(text.as_bytes()).await?;
        }
        drop(child.stdin.take());

        let status = child.wait().await?;
        if !status.success() {
            error!("Piper TTS command failed for: {}", out_path.display());
            return Err(TtsError::Failed(format!(
                "piper exited with status {:?}",
                status.code()
            )));
        }

        let len = tokio::fs::metadata(out_path).await.map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(TtsError::EmptyOutput(out_path.display().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn writes_concatenated_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("client", "tw-ob"))
            .and(query_param("tl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("narration_000.mp3");
        let text = "A first sentence that is reasonably long to fill some space in the request. \
                    And a second sentence which pushes the total past one hundred characters.";
        let tts = GoogleTts::with_base_url(server.uri(), "en");
        tts.synthesize(text, &out).await.unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(bytes, b"ID3ID3".to_vec());
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let tts = GoogleTts::with_base_url(server.uri(), "en");
        let err = tts
            .synthesize("Hello there", &dir.path().join("a.mp3"))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn server_errors_are_plain_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let tts = GoogleTts::with_base_url(server.uri(), "en");
        let err = tts
            .synthesize("Hello there", &dir.path().join("a.mp3"))
            .await
            .unwrap_err();
        assert!(!err.is_rate_limited());
    }
}
