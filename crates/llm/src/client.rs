//! Text generation contract.

use async_trait::async_trait;

/// Result type for generation calls.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors from an external generation call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network or timeout failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("model server returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response envelope could not be read
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Requested shape of the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Free prose
    #[default]
    Text,
    /// Force a JSON object
    Json,
}

/// A single prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prompt text
    pub prompt: String,
    /// Output format
    pub format: OutputFormat,
}

impl GenerationRequest {
    /// Prose request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: OutputFormat::Text,
        }
    }

    /// Request forcing structured JSON output.
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: OutputFormat::Json,
        }
    }
}

/// Something that turns a prompt into text. May fail.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
