//! Catalog service: the facade a request-handling layer calls
//!
//! Ties the cache and the builder together: `get_catalog` serves from the
//! cache when it is fresh and rebuilds otherwise, `invalidate_catalog`
//! discards persisted state, `merge_documents` delegates to the merge
//! engine. A cache store failure after a successful rebuild degrades to a
//! warning; the freshly built catalog is still returned because the file
//! tree, not the cache, is authoritative.

use std::path::{Path, PathBuf};

use crate::cache::{CatalogCache, Clock, SystemClock};
use crate::catalog::{build_catalog, Catalog};
use crate::error::Result;
use crate::manufacturers::ScanDiagnostic;
use crate::merge::{merge_documents, MergedDocument};

/// Default cache file name, stored at the root of the scanned tree
pub const CACHE_FILE_NAME: &str = ".catalog-cache.json";

/// Catalog returned to a caller, with provenance and scan diagnostics
#[derive(Debug, Clone)]
pub struct CatalogResult {
    pub catalog: Catalog,
    /// Epoch seconds at which this catalog was built
    pub built_at: i64,
    /// True when the catalog came from the persisted cache
    pub from_cache: bool,
    /// Per-file problems from the rebuild; empty on a cache hit
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Request-scoped catalog operations over one file tree
pub struct CatalogService {
    root: PathBuf,
    cache: CatalogCache,
}

impl CatalogService {
    /// Service over `root` with an on-disk cache at the default location.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache = CatalogCache::on_disk(root.join(CACHE_FILE_NAME));
        CatalogService { root, cache }
    }

    /// Service with an injected cache, for tests and embedders.
    pub fn with_cache(root: impl Into<PathBuf>, cache: CatalogCache) -> Self {
        CatalogService {
            root: root.into(),
            cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve the catalog, rebuilding when the cache is absent, stale, or
    /// bypassed with `force_refresh`.
    pub fn get_catalog(&self, force_refresh: bool) -> Result<CatalogResult> {
        if !force_refresh {
            if let Some(cached) = self.cache.load()? {
                tracing::debug!("Serving catalog from cache (built at {})", cached.built_at);
                return Ok(CatalogResult {
                    catalog: cached.catalog,
                    built_at: cached.built_at,
                    from_cache: true,
                    diagnostics: Vec::new(),
                });
            }
        }

        let outcome = build_catalog(&self.root)?;
        let built_at = match self.cache.store(&outcome.catalog) {
            Ok(cached) => cached.built_at,
            Err(e) => {
                // Best-effort: the rebuilt catalog is still good.
                tracing::warn!("Failed to persist catalog cache: {}", e);
                SystemClock.now_epoch()
            }
        };
        Ok(CatalogResult {
            catalog: outcome.catalog,
            built_at,
            from_cache: false,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Discard the persisted cache. Idempotent.
    pub fn invalidate_catalog(&self) -> Result<()> {
        self.cache.invalidate()
    }

    /// Merge the patch documents at `paths`; the first is the base.
    pub fn merge_documents(&self, paths: &[PathBuf]) -> Result<MergedDocument> {
        merge_documents(paths)
    }
}
