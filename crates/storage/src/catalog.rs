//! Read-only lookup surface over a genome store.
//!
//! Consumed by request handlers that serve current and historical genomes
//! while an evolution run may be advancing the pool.

use crate::GenomeStore;
use genepool_core::{GenomeId, GenomeRecord, MalformedGenomeId, Time};
use serde::Serialize;
use std::sync::Arc;

/// Why a genome lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The id is not of the form `v<N>`
    #[error(transparent)]
    Malformed(#[from] MalformedGenomeId),

    /// The id is well-formed but absent from the pool
    #[error("genome version '{0}' not found")]
    NotFound(GenomeId),
}

/// A genome together with its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenomeEntry {
    /// Generation id
    pub version: GenomeId,
    /// Genome fields
    pub genome: GenomeRecord,
}

/// All known versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionListing {
    /// Ids, numerically ascending
    pub versions: Vec<GenomeId>,
    /// Latest id
    pub latest: GenomeId,
    /// Number of versions
    pub total: usize,
}

/// Liveness summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Always "healthy" when the store answers
    pub status: String,
    /// Latest genome id
    pub genome_version: GenomeId,
    /// Number of generations stored
    pub total_generations: usize,
    /// When the report was generated
    pub timestamp: Time,
}

/// Lookup and listing operations over a shared store.
#[derive(Clone)]
pub struct GenomeCatalog {
    store: Arc<dyn GenomeStore>,
}

impl GenomeCatalog {
    /// Create a catalog over `store`.
    pub fn new(store: Arc<dyn GenomeStore>) -> Self {
        Self { store }
    }

    /// List all ids sorted numerically.
    pub async fn list(&self) -> VersionListing {
        let versions = self.store.all_ids().await;
        let (latest, _) = self.store.latest().await;
        VersionListing {
            total: versions.len(),
            versions,
            latest,
        }
    }

    /// Fetch a genome by its textual id.
    pub async fn fetch(&self, raw_id: &str) -> Result<GenomeEntry, LookupError> {
        let id: GenomeId = raw_id.parse()?;
        let genome = self
            .store
            .get(&id)
            .await
            .ok_or_else(|| LookupError::NotFound(id.clone()))?;
        Ok(GenomeEntry {
            version: id,
            genome: genome.to_record(),
        })
    }

    /// Fetch the latest id and genome.
    pub async fn latest(&self) -> GenomeEntry {
        let (version, genome) = self.store.latest().await;
        GenomeEntry {
            version,
            genome: genome.to_record(),
        }
    }

    /// Health summary.
    pub async fn health(&self) -> HealthReport {
        let (latest, _) = self.store.latest().await;
        HealthReport {
            status: "healthy".to_string(),
            genome_version: latest,
            total_generations: self.store.len().await,
            timestamp: chrono::Utc::now(),
        }
    }
}
