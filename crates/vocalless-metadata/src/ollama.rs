//! Ollama `/api/generate` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::generator::TextGenerator;

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout: Duration::from_secs(60),
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

impl OllamaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("OLLAMA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Local LLM served by Ollama.
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> MetadataResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, system: &str, prompt: &str) -> MetadataResult<String> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Status { status, body });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.response.trim();
        if text.is_empty() {
            return Err(MetadataError::EmptyResponse);
        }

        debug!(model = %self.config.model, chars = text.len(), "Generated text");
        Ok(text.to_string())
    }
}
