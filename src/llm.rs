pub mod gemini;
pub mod huggingface;
mod models;
pub mod ollama;

pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaClient;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use tracing::warn;

use crate::config::{Config, ConfigError};

/// A text-generation service: one prompt in, one complete answer out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name shown in the status bar.
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    Gemini,
    #[value(name = "huggingface", alias = "hf")]
    HuggingFace,
    Ollama,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::HuggingFace => "huggingface",
            LlmProvider::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true).map_err(|_| ConfigError::UnknownProvider {
            value: s.to_string(),
        })
    }
}

pub fn create_client(provider: LlmProvider, config: &Config) -> Result<Box<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match provider {
        LlmProvider::Gemini => Box::new(GeminiClient::from_config(config)?),
        LlmProvider::HuggingFace => Box::new(HuggingFaceClient::from_config(config)?),
        LlmProvider::Ollama => Box::new(OllamaClient::from_config(config)),
    };
    Ok(client)
}

/// Build the configured provider, wrapped in a [`FallbackClient`] when a
/// fallback provider is set. A primary that cannot be built (usually a
/// missing API key) leaves the fallback to answer alone.
pub fn client_from_config(config: &Config) -> Result<Box<dyn LlmClient>> {
    let Some(fallback) = config.fallback.filter(|fallback| *fallback != config.provider) else {
        return create_client(config.provider, config);
    };

    let secondary = create_client(fallback, config)?;
    match create_client(config.provider, config) {
        Ok(primary) => Ok(Box::new(FallbackClient::new(primary, secondary))),
        Err(err) => {
            warn!(
                error = %err,
                provider = %config.provider,
                fallback = %fallback,
                "primary provider unavailable, using fallback only"
            );
            Ok(secondary)
        }
    }
}

/// Tries `primary` first and asks `secondary` only when it fails.
pub struct FallbackClient {
    primary: Box<dyn LlmClient>,
    secondary: Box<dyn LlmClient>,
}

impl FallbackClient {
    pub fn new(primary: Box<dyn LlmClient>, secondary: Box<dyn LlmClient>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl LlmClient for FallbackClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.primary.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = self.secondary.model(),
                    "primary model failed, trying fallback"
                );
                self.secondary.generate(prompt).await
            }
        }
    }

    fn model(&self) -> &str {
        self.primary.model()
    }
}
