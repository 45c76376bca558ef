use anyhow::Context;
use sled::Db;
use std::path::Path;

use crate::cache::{CachedScores, QueryKey, ResultCache};
use crate::error::{CollocationError, Result};

const SCORES_TREE: &str = "scored_candidates";

/// Result cache persisted in a sled database, values encoded with bincode.
pub struct SledCache {
    db: Db,
}

fn cache_err(err: anyhow::Error) -> CollocationError {
    CollocationError::Cache(err)
}

impl SledCache {
    /// Open or create a cache database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .context("Failed to open cache database")
            .map_err(cache_err)?;
        Ok(Self { db })
    }

    /// Create a temporary database (for testing)
    pub fn in_memory() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .context("Failed to create in-memory cache database")
            .map_err(cache_err)?;
        Ok(Self { db })
    }

    fn tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(SCORES_TREE)
            .context("Failed to open cache tree")
            .map_err(cache_err)
    }

    fn encode_key(key: &QueryKey) -> Result<Vec<u8>> {
        bincode::serialize(key)
            .context("Failed to encode cache key")
            .map_err(cache_err)
    }

    /// Number of cached queries
    pub fn len(&self) -> Result<usize> {
        Ok(self.tree()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Flush all changes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush cache").map_err(cache_err)?;
        Ok(())
    }
}

impl ResultCache for SledCache {
    fn get(&self, key: &QueryKey) -> Result<Option<CachedScores>> {
        let tree = self.tree()?;
        let data = tree
            .get(Self::encode_key(key)?)
            .context("Failed to read cache entry")
            .map_err(cache_err)?;

        match data {
            Some(data) => {
                let scores = bincode::deserialize(&data)
                    .context("Failed to decode cache entry")
                    .map_err(cache_err)?;
                Ok(Some(scores))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: QueryKey, scores: CachedScores) -> Result<()> {
        let tree = self.tree()?;
        let serialized = bincode::serialize(&scores)
            .context("Failed to encode cache entry")
            .map_err(cache_err)?;
        tree.insert(Self::encode_key(&key)?, serialized)
            .context("Failed to write cache entry")
            .map_err(cache_err)?;
        Ok(())
    }

    fn invalidate(&self, key: &QueryKey) -> Result<()> {
        let tree = self.tree()?;
        tree.remove(Self::encode_key(key)?)
            .context("Failed to remove cache entry")
            .map_err(cache_err)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.tree()?
            .clear()
            .context("Failed to clear cache")
            .map_err(cache_err)?;
        Ok(())
    }
}
