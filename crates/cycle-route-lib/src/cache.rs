//! Caller-owned cache of loaded coordinate rows
//!
//! Entries are keyed by the canonical source path and the loader config, and
//! carry a fingerprint of the file (length and modification time). A lookup
//! whose fingerprint no longer matches re-reads the source.

use crate::{CoordinateRow, DataError, LoaderConfig, Result, loader};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    config: LoaderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceFingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceFingerprint {
    fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

struct CacheEntry {
    fingerprint: SourceFingerprint,
    rows: Arc<Vec<CoordinateRow>>,
}

/// Bounded LRU cache in front of [`loader::load_csv`]
pub struct RouteDataCache {
    entries: LruCache<CacheKey, CacheEntry>,
    hits: usize,
    misses: usize,
}

impl RouteDataCache {
    pub const DEFAULT_CAPACITY: usize = 4;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Rows of the source, loading it unless an up-to-date entry exists
    pub fn load<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: &LoaderConfig,
    ) -> Result<Arc<Vec<CoordinateRow>>> {
        let path = path.as_ref();
        let unavailable =
            |e: std::io::Error| DataError::unavailable(path.display().to_string(), e.to_string());

        let canonical = path.canonicalize().map_err(unavailable)?;
        let fingerprint = SourceFingerprint::of(&canonical).map_err(unavailable)?;
        let key = CacheKey {
            path: canonical,
            config: config.clone(),
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.fingerprint == fingerprint {
                self.hits += 1;
                tracing::debug!("Route data cache hit for {}", path.display());
                return Ok(entry.rows.clone());
            }
            tracing::info!("{} changed on disk, reloading", path.display());
        }

        self.misses += 1;
        let rows = Arc::new(loader::load_csv(&key.path, config)?);
        self.entries.put(
            key,
            CacheEntry {
                fingerprint,
                rows: rows.clone(),
            },
        );
        Ok(rows)
    }

    /// Drop every entry for the source, returning how many were removed
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> usize {
        let path = path.as_ref();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, _)| key.path == canonical)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.entries.pop(key);
        }
        stale.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation
    pub fn hit_stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

impl Default for RouteDataCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
