//! Ollama text-generation client.

use crate::client::{GenerationRequest, LlmError, OutputFormat, Result, TextGenerator};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Server URL
    pub base_url: String,
    /// Model used for judging, diagnosis and mutation
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:70b".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

/// Ollama client.
#[derive(Clone)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,

    /// Connection settings
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client.
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Model name in use.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Request body for `/api/generate`.
    fn payload(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut payload = json!({
            "model": self.config.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature
            }
        });
        if request.format == OutputFormat::Json {
            payload["format"] = json!("json");
        }
        payload
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if Ollama server is available.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self.client.get(self.endpoint("/api/version")).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            "Generating with {} ({} prompt chars, {:?})",
            self.config.model,
            request.prompt.len(),
            request.format
        );

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&self.payload(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| LlmError::Protocol(e.to_string()))?;

        Ok(data.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.model, "llama3.1:70b");
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_json_payload_forces_format() {
        let client = OllamaClient::new(OllamaConfig::default());
        let payload = client.payload(&GenerationRequest::json("grade this"));
        assert_eq!(payload["format"], "json");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["prompt"], "grade this");
        assert_eq!(payload["model"], "llama3.1:70b");
    }

    #[test]
    fn test_text_payload_has_no_format() {
        let client = OllamaClient::new(OllamaConfig::default());
        let payload = client.payload(&GenerationRequest::text("explain"));
        assert!(payload.get("format").is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://ollama:11434/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.endpoint("/api/generate"), "http://ollama:11434/api/generate");
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: OllamaConfig = serde_json::from_str(r#"{"model": "qwen2.5:7b"}"#).unwrap();
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.timeout_secs, 120);
    }
}
