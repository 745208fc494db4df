//! JSON file genome store.
//!
//! The whole pool lives in one JSON object mapping genome id to a flat
//! genome record. Every `add` rewrites the file (temp file + rename) before
//! the new generation becomes visible in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use genepool_core::{Genome, GenomeId};
use super::{GenomeStore, StorageError, Result};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// In-memory pool ordered by numeric id.
type Pool = BTreeMap<GenomeId, Genome>;

/// File-based JSON genome store.
pub struct JsonGenomeStore {
    path: PathBuf,
    pool: RwLock<Pool>,
    // Serializes read-modify-write cycles of `add`.
    writer: Mutex<()>,
}

impl JsonGenomeStore {
    /// Open the store at `path`, creating the parent directory if needed,
    /// and load the pool.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let store = Self {
            path,
            pool: RwLock::new(Pool::new()),
            writer: Mutex::new(()),
        };
        store.load().await?;
        Ok(store)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populate the pool from disk.
    ///
    /// A missing or unparsable file yields a pool holding only the `v0`
    /// baseline; an unparsable file is first moved aside. Calling this again
    /// reloads the same state.
    pub async fn load(&self) -> Result<()> {
        let _guard = self.writer.lock().await;

        let mut pool = match fs::read_to_string(&self.path).await {
            Ok(json) => match serde_json::from_str::<Pool>(&json) {
                Ok(pool) => {
                    info!("Loaded {} genome generations from {}", pool.len(), self.path.display());
                    pool
                }
                Err(e) => {
                    warn!("Gene pool at {} is corrupt ({}). Starting fresh.", self.path.display(), e);
                    self.quarantine().await?;
                    Pool::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Pool::new(),
            Err(e) => return Err(e.into()),
        };

        let baseline = GenomeId::baseline();
        if !pool.contains_key(&baseline) {
            info!("Seeding gene pool with baseline {}", baseline);
            pool.insert(baseline, Genome::baseline());
            self.persist(&pool).await?;
        }

        *self.pool.write().await = pool;
        Ok(())
    }

    /// Move the unreadable file to `<file>.corrupt`. Seeding must not
    /// proceed if this fails.
    async fn quarantine(&self) -> Result<()> {
        let mut aside = self.path.clone().into_os_string();
        aside.push(".corrupt");
        fs::rename(&self.path, &aside).await.map_err(|e| {
            error!("Could not move corrupt gene pool aside: {}", e);
            StorageError::Io(e)
        })
    }

    async fn persist(&self, pool: &Pool) -> Result<()> {
        let json = serde_json::to_string_pretty(pool)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write = async {
            fs::write(&tmp, json.as_bytes()).await?;
            fs::rename(&tmp, &self.path).await
        };
        write.await.map_err(|source| StorageError::Persist {
            path: self.path.clone(),
            source,
        })?;

        debug!("Persisted {} generations to {}", pool.len(), self.path.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl GenomeStore for JsonGenomeStore {
    async fn get(&self, id: &GenomeId) -> Option<Genome> {
        self.pool.read().await.get(id).cloned()
    }

    async fn latest(&self) -> (GenomeId, Genome) {
        match self.pool.read().await.last_key_value() {
            Some((id, genome)) => (id.clone(), genome.clone()),
            None => (GenomeId::baseline(), Genome::baseline()),
        }
    }

    async fn add(&self, id: GenomeId, genome: Genome) -> Result<()> {
        let _guard = self.writer.lock().await;

        let mut next = self.pool.read().await.clone();
        next.insert(id.clone(), genome);
        self.persist(&next).await?;

        *self.pool.write().await = next;
        info!("Added genome {} to gene pool", id);
        Ok(())
    }

    async fn append(&self, genome: Genome) -> Result<GenomeId> {
        let _guard = self.writer.lock().await;

        let mut next = self.pool.read().await.clone();
        let id = next
            .last_key_value()
            .map(|(id, _)| id.successor())
            .unwrap_or_else(|| GenomeId::version(1));
        next.insert(id.clone(), genome);
        self.persist(&next).await?;

        *self.pool.write().await = next;
        info!("Appended genome {} to gene pool", id);
        Ok(id)
    }

    async fn all_ids(&self) -> Vec<GenomeId> {
        self.pool.read().await.keys().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.pool.read().await.len()
    }
}
