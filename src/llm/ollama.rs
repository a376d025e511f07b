use super::LlmClient;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use tracing::debug;

pub const DEFAULT_HOST: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Local model served by Ollama. Needs no credentials, which makes it the
/// natural fallback for the hosted providers.
pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            client: Ollama::new(host.to_string(), port),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ollama.host, config.ollama.port).with_model(&config.ollama.model)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, "sending prompt to Ollama");

        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        let response = self
            .client
            .generate(request)
            .await
            .context("Failed to generate completion from Ollama")?;

        if response.response.is_empty() {
            anyhow::bail!("Empty response from Ollama");
        }
        Ok(response.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        let address = server.address();
        OllamaClient::new(&format!("http://{}", address.ip()), address.port())
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "model": "llama3.2:latest",
            "created_at": "2024-01-01T00:00:00Z",
            "response": text,
            "done": true
        })
    }

    #[tokio::test]
    async fn generates_completion_for_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama3.2:latest",
                "prompt": "What is Rust?",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("A *systems* language.")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).generate("What is Rust?").await.unwrap();
        assert_eq!(text, "A *systems* language.");
    }

    #[tokio::test]
    async fn model_override_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "mistral"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).with_model("mistral");
        assert_eq!(client.model(), "mistral");
        assert_eq!(client.generate("hi").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("")))
            .mount(&server)
            .await;

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("Empty response"));
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not found"))
            .mount(&server)
            .await;

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("Failed to generate completion from Ollama"));
    }
}
