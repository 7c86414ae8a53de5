use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::LlmSettings;
use crate::error::LlmError;

/// A backend that turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

pub fn script_prompt(topic: &str, video_length: u32) -> String {
    format!(
        r#"Create a {video_length}-second video script about: {topic}

Include:
1. Hook/introduction (5-10 seconds)
2. Main content points ({body_min}-{body_max} seconds)
3. Call to action (5-10 seconds)

Write one line per spoken segment in the form "M:SS - narration text".
Do not add any other commentary."#,
        body_min = video_length.saturating_sub(20),
        body_max = video_length.saturating_sub(10),
    )
}

/// OpenAI-compatible chat completion endpoint.
pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl ChatCompletionGenerator {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        info!("Requesting script from {}", self.settings.model);
        let mut request = self
            .client
            .post(&self.settings.api_url)
            .header("Content-Type", "application/json");
        if !self.settings.api_key.is_empty() {
            request = request.header(
                "Authorization",
                format!("Bearer {}", self.settings.api_key),
            );
        }

        let response = request
            .json(&serde_json::json!({
                "model": self.settings.model,
                "messages": [
                    {
                        "role": "system",
                        "content": "You write short, punchy narration scripts for tech explainer videos.",
                    },
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": self.settings.temperature,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse(format!("{:?}", response)))?;
        debug!("Generated script: {:.200}", content);

        Ok(content.to_string())
    }
}
