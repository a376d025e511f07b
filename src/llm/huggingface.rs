use super::models::InferenceRequest;
use super::LlmClient;
use crate::config::{Config, ConfigError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "facebook/blenderbot-400M-distill";

/// Hosted Hugging Face inference endpoint.
pub struct HuggingFaceClient {
    http: reqwest::Client,
    api_token: String,
    model: String,
    base_url: String,
}

impl HuggingFaceClient {
    pub fn new(api_token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_token: api_token.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_token = config
            .huggingface
            .api_token
            .as_deref()
            .ok_or(ConfigError::MissingKey {
                var: "HF_API_TOKEN",
            })?;

        Ok(Self::new(api_token, config.request_timeout)?
            .with_model(&config.huggingface.model)
            .with_base_url(&config.huggingface.base_url))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Endpoints answer either `[{"generated_text": ..}]` or a bare object.
fn extract_text(body: Value) -> Result<String> {
    match body {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Hugging Face response has no generated_text"),
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                anyhow::bail!("Hugging Face API error: {}", error);
            }
            match map.get("generated_text").and_then(Value::as_str) {
                Some(text) => Ok(text.to_string()),
                None => Ok(Value::Object(map).to_string()),
            }
        }
        other => anyhow::bail!("Unexpected Hugging Face response: {}", other),
    }
}

#[async_trait]
impl LlmClient for HuggingFaceClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, "sending prompt to Hugging Face");

        let response = self
            .http
            .post(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.api_token)
            .json(&InferenceRequest { inputs: prompt })
            .send()
            .await
            .context("Failed to send request to Hugging Face API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("Hugging Face API error: {}: {}", status, text);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Hugging Face API response")?;

        extract_text(body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn list_and_object_shapes() {
        assert_eq!(
            extract_text(json!([{"generated_text": "hi there"}])).unwrap(),
            "hi there"
        );
        assert_eq!(
            extract_text(json!({"generated_text": "single"})).unwrap(),
            "single"
        );
        assert_eq!(
            extract_text(json!({"summary_text": "other"})).unwrap(),
            r#"{"summary_text":"other"}"#
        );
    }

    #[test]
    fn error_shapes_fail() {
        assert!(extract_text(json!({"error": "Model is loading"})).is_err());
        assert!(extract_text(json!([])).is_err());
        assert!(extract_text(json!("text")).is_err());
    }

    #[tokio::test]
    async fn posts_inputs_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/blenderbot-400M-distill"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(json!({"inputs": "hello"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "Hi!"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("hf_test", Duration::from_secs(5))
            .unwrap()
            .with_base_url(&server.uri());
        assert_eq!(client.generate("hello").await.unwrap(), "Hi!");
    }

    #[tokio::test]
    async fn service_unavailable_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("hf_test", Duration::from_secs(5))
            .unwrap()
            .with_base_url(&server.uri());
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
