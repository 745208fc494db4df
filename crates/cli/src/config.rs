//! Runtime configuration: TOML file, then environment, then flags.

use anyhow::{Context, Result};
use genepool_execution::{LoopConfig, PipelineConfig};
use genepool_llm::OllamaConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, read when present.
pub const DEFAULT_CONFIG_FILE: &str = "genepool.toml";

/// Where the genome pool lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory
    pub data_dir: PathBuf,
    /// Pool file name inside `data_dir`
    pub file_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            file_name: "sop_gene_pool.json".to_string(),
        }
    }
}

impl StoreConfig {
    /// Full path of the pool file.
    pub fn pool_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub llm: OllamaConfig,
    pub pipeline: PipelineConfig,
    pub evolution: LoopConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            llm: OllamaConfig::default(),
            pipeline: PipelineConfig::default(),
            evolution: LoopConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using `lookup`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("GENEPOOL_PIPELINE_URL") {
            self.pipeline.endpoint = url;
        }
        self
    }
}
