//! Genome store trait abstraction.

use async_trait::async_trait;
use genepool_core::{Genome, GenomeId};
use std::path::PathBuf;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the pool to disk failed; the in-memory pool is unchanged
    #[error("failed to persist gene pool to {}: {source}", path.display())]
    Persist {
        /// Target file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Append-only, versioned collection of genomes.
///
/// Readers may run concurrently with an evolution run and must tolerate the
/// latest id advancing between two reads.
#[async_trait]
pub trait GenomeStore: Send + Sync {
    /// Load a genome by id.
    async fn get(&self, id: &GenomeId) -> Option<Genome>;

    /// Genome with the highest numeric suffix.
    async fn latest(&self) -> (GenomeId, Genome);

    /// Insert or overwrite `id` and flush the whole pool before returning.
    ///
    /// On failure the pool is left as it was.
    async fn add(&self, id: GenomeId, genome: Genome) -> Result<()>;

    /// Store `genome` under `v<max suffix + 1>` and return that id.
    ///
    /// Choosing the id and flushing happen under the same write lock, so
    /// concurrent appends never share an id.
    async fn append(&self, genome: Genome) -> Result<GenomeId>;

    /// All ids, numerically ascending.
    async fn all_ids(&self) -> Vec<GenomeId>;

    /// Number of generations stored.
    async fn len(&self) -> usize {
        self.all_ids().await.len()
    }

    /// Whether the pool holds no generations.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
