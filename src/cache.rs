//! Persisted catalog cache with a time-based freshness window
//!
//! The cache is advisory: the file tree is authoritative and the cache may
//! always be discarded and rebuilt, so a corrupt cache file is treated as a
//! miss rather than an error. Clock and storage are injectable so freshness
//! and invalidation are testable without real timestamps or disk layout.
//! The filesystem store replaces atomically (write to temp, then rename) so
//! an overlapping reader sees either the old or the new cache, never a
//! partial write.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::Result;

/// Default freshness window in seconds
pub const DEFAULT_FRESHNESS_SECS: u64 = 3600;

/// Source of "now" in epoch seconds
pub trait Clock: Send + Sync {
    fn now_epoch(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed time for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch(&self) -> i64 {
        self.0
    }
}

/// Persistence backend for the serialized cache
pub trait CacheStore: Send + Sync {
    /// Full contents, or `None` when no cache has been persisted.
    fn read(&self) -> Result<Option<String>>;
    /// Replace the persisted state atomically with respect to readers.
    fn write(&self, contents: &str) -> Result<()>;
    /// Discard persisted state; absent state is not an error.
    fn remove(&self) -> Result<()>;
}

/// Cache persisted as a single JSON file, replaced via temp-then-rename
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCacheStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.as_os_str().to_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        let temp = self.temp_path();
        std::fs::write(&temp, contents)?;
        // Rename within one directory is atomic on POSIX filesystems.
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    contents: Mutex<Option<String>>,
}

impl CacheStore for MemoryCacheStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.lock().expect("cache store lock").clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.contents.lock().expect("cache store lock") = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.contents.lock().expect("cache store lock") = None;
        Ok(())
    }
}

/// Persisted form: build timestamp plus the catalog entries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCatalog {
    /// Epoch seconds at which the catalog was built
    pub built_at: i64,
    #[serde(flatten)]
    pub catalog: Catalog,
}

/// Freshness-checked cache over an injectable clock and store
pub struct CatalogCache {
    clock: Box<dyn Clock>,
    store: Box<dyn CacheStore>,
    freshness_secs: u64,
}

impl CatalogCache {
    pub fn new(clock: Box<dyn Clock>, store: Box<dyn CacheStore>, freshness_secs: u64) -> Self {
        CatalogCache {
            clock,
            store,
            freshness_secs,
        }
    }

    /// Cache backed by the given file, wall clock, default freshness window.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        CatalogCache::new(
            Box::new(SystemClock),
            Box::new(FileCacheStore::new(path)),
            DEFAULT_FRESHNESS_SECS,
        )
    }

    /// Return the cached catalog when present and fresh, `None` on a miss.
    ///
    /// A stale or unreadable cache is a miss, not an error.
    pub fn load(&self) -> Result<Option<CachedCatalog>> {
        let Some(contents) = self.store.read()? else {
            return Ok(None);
        };
        let cached: CachedCatalog = match serde_json::from_str(&contents) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Discarding unreadable catalog cache: {}", e);
                return Ok(None);
            }
        };
        let age = self.clock.now_epoch() - cached.built_at;
        if age < 0 || age as u64 >= self.freshness_secs {
            tracing::debug!("Catalog cache stale (age {}s)", age);
            return Ok(None);
        }
        Ok(Some(cached))
    }

    /// Persist the catalog with the current timestamp, replacing prior state.
    pub fn store(&self, catalog: &Catalog) -> Result<CachedCatalog> {
        let cached = CachedCatalog {
            built_at: self.clock.now_epoch(),
            catalog: catalog.clone(),
        };
        let contents = serde_json::to_string_pretty(&cached)
            .map_err(|e| crate::error::Error::Internal(format!("cache serialization: {e}")))?;
        self.store.write(&contents)?;
        Ok(cached)
    }

    /// Unconditionally discard persisted state. Idempotent.
    pub fn invalidate(&self) -> Result<()> {
        self.store.remove()
    }
}
