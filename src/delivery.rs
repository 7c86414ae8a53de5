use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Uploads finished files to a transfer.sh-compatible host.
pub struct Deliverer {
    client: reqwest::Client,
    base_url: String,
}

impl Deliverer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// PUTs the file and returns the share URL from the response body. Failures are logged, never raised.
    pub async fn deliver(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        let (file, size) = match open_for_upload(path).await {
            Ok(opened) => opened,
            Err(e) => {
                warn!("Cannot read {} for upload: {}", path.display(), e);
                return None;
            }
        };

        let url = format!("{}/{}", self.base_url, name);
        info!("Uploading {} ({} bytes) to {}", name, size, self.base_url);
        let response = match self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type(path))
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Upload of {} failed: {}", name, e);
                return None;
            }
        };

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            warn!("Upload of {} rejected with status {}", name, status);
            return None;
        }
        match response.text().await {
            Ok(body) if !body.trim().is_empty() => {
                let link = body.trim().to_string();
                info!("Uploaded {}: {}", name, link);
                Some(link)
            }
            Ok(_) => {
                warn!("Upload of {} returned an empty body", name);
                None
            }
            Err(e) => {
                warn!("Could not read upload response for {}: {}", name, e);
                None
            }
        }
    }
}

/// Opened file plus its length; the body is streamed from disk.
async fn open_for_upload(path: &Path) -> std::io::Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}

pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Written next to the video as `<name>_delivery.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryManifest {
    pub video_file: PathBuf,
    pub video_url: Option<String>,
    pub instructions_file: PathBuf,
    pub instructions_url: Option<String>,
    pub created_at: DateTime<Local>,
}

impl DeliveryManifest {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write delivery manifest {}", path.display()))?;
        Ok(())
    }
}
