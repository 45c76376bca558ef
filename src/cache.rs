//! Keyed cache for scored candidates.
//!
//! The engine receives a cache as a capability; nothing here is global.
//! Entries live until the caller invalidates them. Key fingerprints use a
//! fixed algorithm (CRC-32 plus an item count), so persisted entries keep
//! matching across builds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{CollocationError, Result};
use crate::scoring::{RelevanceScale, ScoredCandidate};

/// Everything the unfiltered scores depend on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub target: String,
    pub before: usize,
    pub after: usize,
    pub scale: RelevanceScale,
    pub corpus: u64,
    pub reference: u64,
}

/// Content fingerprint with a stable byte layout.
///
/// The high 32 bits hold the number of items written, the low 32 bits the
/// CRC-32 of their bytes.
pub(crate) struct Fingerprint {
    crc: crc32fast::Hasher,
    items: u64,
}

impl Fingerprint {
    pub(crate) fn new() -> Self {
        Self {
            crc: crc32fast::Hasher::new(),
            items: 0,
        }
    }

    pub(crate) fn write_str(&mut self, value: &str) {
        self.crc.update(value.as_bytes());
        // 0xff never occurs in UTF-8, so strings cannot run into each other
        self.crc.update(&[0xff]);
        self.items += 1;
    }

    pub(crate) fn write_u64(&mut self, value: u64) {
        self.crc.update(&value.to_le_bytes());
        self.items += 1;
    }

    pub(crate) fn finish(self) -> u64 {
        (self.items << 32) | u64::from(self.crc.finalize())
    }
}

/// What a query costs to recompute: the target's occurrence count and its
/// unfiltered scored candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedScores {
    pub occurrences: u64,
    pub candidates: Vec<ScoredCandidate>,
}

/// Cache backend for scored candidates.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &QueryKey) -> Result<Option<CachedScores>>;

    fn put(&self, key: QueryKey, scores: CachedScores) -> Result<()>;

    fn invalidate(&self, key: &QueryKey) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<QueryKey, CachedScores>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CollocationError {
    CollocationError::Cache(anyhow::anyhow!("cache lock poisoned"))
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &QueryKey) -> Result<Option<CachedScores>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: QueryKey, scores: CachedScores) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key, scores);
        Ok(())
    }

    fn invalidate(&self, key: &QueryKey) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}
