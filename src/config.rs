//! Runtime configuration.
//!
//! Values come from the environment (after `.env` is loaded) and are then
//! overridden by command-line flags.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;
use crate::llm::{self, LlmProvider};
use crate::reveal;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Longest accepted delay between revealed words.
const MAX_REVEAL_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be set to use this provider")]
    MissingKey { var: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("unknown provider {value:?} (expected gemini, huggingface or ollama)")]
    UnknownProvider { value: String },
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceSettings {
    pub api_token: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub host: String,
    pub port: u16,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,
    pub fallback: Option<LlmProvider>,
    pub gemini: GeminiSettings,
    pub huggingface: HuggingFaceSettings,
    pub ollama: OllamaSettings,
    pub reveal_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let provider = match get("CEREBRO_PROVIDER") {
            Some(value) => value.parse()?,
            None => LlmProvider::Gemini,
        };
        let fallback = get("CEREBRO_FALLBACK")
            .map(|value| value.parse::<LlmProvider>())
            .transpose()?;

        let reveal_interval = match get("CEREBRO_REVEAL_MS") {
            Some(value) => clamped_reveal_interval(parse_number("CEREBRO_REVEAL_MS", &value)?),
            None => reveal::DEFAULT_INTERVAL,
        };
        let request_timeout = match get("CEREBRO_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_number("CEREBRO_TIMEOUT_SECS", &value)?),
            None => DEFAULT_TIMEOUT,
        };

        let ollama_port = match get("OLLAMA_PORT") {
            Some(value) => parse_number("OLLAMA_PORT", &value)?,
            None => llm::ollama::DEFAULT_PORT,
        };

        Ok(Self {
            provider,
            fallback,
            gemini: GeminiSettings {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| llm::gemini::DEFAULT_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| llm::gemini::DEFAULT_BASE_URL.to_string()),
            },
            huggingface: HuggingFaceSettings {
                api_token: get("HF_API_TOKEN"),
                model: get("HF_MODEL")
                    .unwrap_or_else(|| llm::huggingface::DEFAULT_MODEL.to_string()),
                base_url: get("HF_BASE_URL")
                    .unwrap_or_else(|| llm::huggingface::DEFAULT_BASE_URL.to_string()),
            },
            ollama: OllamaSettings {
                host: get("OLLAMA_HOST").unwrap_or_else(|| llm::ollama::DEFAULT_HOST.to_string()),
                port: ollama_port,
                model: get("OLLAMA_MODEL")
                    .unwrap_or_else(|| llm::ollama::DEFAULT_MODEL.to_string()),
            },
            reveal_interval,
            request_timeout,
        })
    }

    /// Apply command-line flags. `--model` only affects the primary provider.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(provider) = cli.provider {
            self.provider = provider;
        }
        if let Some(fallback) = cli.fallback {
            self.fallback = Some(fallback);
        }
        if let Some(ms) = cli.reveal_ms {
            self.reveal_interval = clamped_reveal_interval(ms);
        }
        if let Some(model) = &cli.model {
            match self.provider {
                LlmProvider::Gemini => self.gemini.model = model.clone(),
                LlmProvider::HuggingFace => self.huggingface.model = model.clone(),
                LlmProvider::Ollama => self.ollama.model = model.clone(),
            }
        }
        self
    }

    pub fn model_for(&self, provider: LlmProvider) -> &str {
        match provider {
            LlmProvider::Gemini => &self.gemini.model,
            LlmProvider::HuggingFace => &self.huggingface.model,
            LlmProvider::Ollama => &self.ollama.model,
        }
    }
}

fn clamped_reveal_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.min(MAX_REVEAL_MS))
}

fn parse_number<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn mask(secret: &Option<String>) -> String {
    match secret {
        Some(secret) if secret.chars().count() > 8 => {
            let head: String = secret.chars().take(4).collect();
            format!("{head}…")
        }
        Some(_) => "set".to_string(),
        None => "not set".to_string(),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "provider:        {}", self.provider)?;
        match self.fallback {
            Some(fallback) => writeln!(f, "fallback:        {fallback}")?,
            None => writeln!(f, "fallback:        none")?,
        }
        writeln!(f, "reveal interval: {} ms", self.reveal_interval.as_millis())?;
        writeln!(f, "request timeout: {} s", self.request_timeout.as_secs())?;
        writeln!(f)?;
        writeln!(f, "[gemini]")?;
        writeln!(f, "model:    {}", self.gemini.model)?;
        writeln!(f, "base url: {}", self.gemini.base_url)?;
        writeln!(f, "api key:  {}", mask(&self.gemini.api_key))?;
        writeln!(f)?;
        writeln!(f, "[huggingface]")?;
        writeln!(f, "model:    {}", self.huggingface.model)?;
        writeln!(f, "base url: {}", self.huggingface.base_url)?;
        writeln!(f, "token:    {}", mask(&self.huggingface.api_token))?;
        writeln!(f)?;
        writeln!(f, "[ollama]")?;
        writeln!(f, "host:     {}:{}", self.ollama.host, self.ollama.port)?;
        write!(f, "model:    {}", self.ollama.model)
    }
}
