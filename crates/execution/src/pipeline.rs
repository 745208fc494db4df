//! Answer-producing pipeline contract and its HTTP adapter.

use async_trait::async_trait;
use genepool_core::{Genome, GenomeRecord, PipelineRun};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Errors raised by a pipeline execution.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Network or timeout failure
    #[error("pipeline transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Pipeline answered with a non-success status
    #[error("pipeline returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Runs a request through the multi-agent pipeline under a genome.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Produce a response plus ordered findings. May fail.
    async fn run(&self, request: &str, genome: &Genome) -> Result<PipelineRun, PipelineError>;
}

/// Where the remote pipeline lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Endpoint accepting `{request, genome}`
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/pipeline/run".to_string(),
            timeout_secs: 600,
        }
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    request: &'a str,
    genome: GenomeRecord,
}

/// Pipeline reached over HTTP.
#[derive(Clone)]
pub struct HttpPipeline {
    client: Client,
    config: PipelineConfig,
}

impl HttpPipeline {
    /// Create a new HTTP pipeline client.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }
}

#[async_trait]
impl Pipeline for HttpPipeline {
    async fn run(&self, request: &str, genome: &Genome) -> Result<PipelineRun, PipelineError> {
        debug!("Posting request to pipeline at {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&RunRequest {
                request,
                genome: genome.to_record(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Status { status, body });
        }

        Ok(response.json::<PipelineRun>().await?)
    }
}
