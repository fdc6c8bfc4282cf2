//! Memoized dataset loads
//!
//! A dataset path is read and parsed once, then shared immutably across
//! pipeline runs. Entries live until `invalidate`/`clear` or process exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::sync::Cache;

use super::error::PipelineResult;
use super::loader::load_dataset;
use super::record::DebtRecord;

/// Shared, read-only dataset snapshot
pub type Dataset = Arc<[DebtRecord]>;

/// Load cache keyed by canonicalized dataset path.
///
/// Cloning is cheap and clones share the same entries. Safe for concurrent
/// readers; the only writes are the inserts done by `load`. The cache is
/// unbounded, so entries are never evicted behind the caller's back.
#[derive(Clone)]
pub struct DatasetCache {
    entries: Cache<PathBuf, Dataset>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Load the dataset at `path`, reusing a previous load when available.
    ///
    /// Absent files yield `Ok(None)` and are not cached, so a file that
    /// appears later is picked up on the next call.
    pub fn load(&self, path: &Path) -> PipelineResult<Option<Dataset>> {
        let key = cache_key(path);
        if let Some(hit) = self.entries.get(&key) {
            tracing::debug!(path = %key.display(), "dataset cache hit");
            return Ok(Some(hit));
        }

        let Some(records) = load_dataset(path)? else {
            return Ok(None);
        };

        let dataset: Dataset = records.into();
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(Some(dataset))
    }

    /// Whether `path` currently has a cached load
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&cache_key(path))
    }

    /// Drop the cached load for one path
    pub fn invalidate(&self, path: &Path) {
        self.entries.invalidate(&cache_key(path));
    }

    /// Drop every cached load
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of cached datasets, after pending maintenance has run
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
