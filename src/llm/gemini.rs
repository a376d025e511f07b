use super::models::{GeminiContent, GeminiRequest, GeminiResponse, GenerationConfig};
use super::LlmClient;
use crate::config::{Config, ConfigError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            generation_config: GenerationConfig::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .gemini
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey {
                var: "GEMINI_API_KEY",
            })?;

        Ok(Self::new(api_key, config.request_timeout)?
            .with_model(&config.gemini.model)
            .with_base_url(&config.gemini.base_url))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn send_request(&self, request: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("Gemini API error: {}: {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse Gemini API response")
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent::user(prompt)],
            generation_config: self.generation_config.clone(),
        };

        debug!(model = %self.model, "sending prompt to Gemini");
        let response = self.send_request(&request).await?;

        match response.text() {
            Some(text) => Ok(text),
            None => {
                let reason = response
                    .candidates
                    .first()
                    .and_then(|candidate| candidate.finish_reason.as_deref())
                    .unwrap_or("none");
                anyhow::bail!("Empty response from Gemini API (finish reason: {})", reason)
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
