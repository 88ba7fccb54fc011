//! Render cache consulted before any worker round-trip.
//!
//! The memory tier is a reader-writer map, so any number of callers can look
//! up entries in parallel while the worker channel serializes misses. An
//! optional directory tier keeps rendered HTML across runs under the same
//! fingerprint scheme.

mod disk;
mod key;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

pub use self::key::CacheKey;
use self::disk::DiskStore;

/// Log target for cache operations.
const CACHE_TARGET: &str = "katex_ssr::cache";

/// Fingerprint-addressed store of rendered HTML.
#[derive(Debug, Default)]
pub struct RenderCache {
    memory: RwLock<HashMap<CacheKey, Arc<str>>>,
    disk: Option<DiskStore>,
}

impl RenderCache {
    /// Creates a memory-only cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that also persists entries under `dir`.
    #[must_use]
    pub fn with_directory(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            memory: RwLock::default(),
            disk: Some(DiskStore::new(dir)),
        }
    }

    /// Directory backing the persistent tier, if any.
    #[must_use]
    pub fn directory(&self) -> Option<&Utf8Path> {
        self.disk.as_ref().map(DiskStore::root)
    }

    /// Looks up a rendered formula.
    ///
    /// Entries found only on disk are promoted into memory.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        if let Some(html) = self
            .memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Some(Arc::clone(html));
        }
        let html: Arc<str> = self.disk.as_ref()?.load(key)?.into();
        debug!(target: CACHE_TARGET, key = %key, "promoted persisted render");
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), Arc::clone(&html));
        Some(html)
    }

    /// Stores a rendered formula, replacing any previous entry.
    ///
    /// Rendering is deterministic, so concurrent writers of one key store
    /// the same content.
    pub fn put(&self, key: CacheKey, html: impl Into<Arc<str>>) {
        let shared: Arc<str> = html.into();
        if let Some(disk) = &self.disk {
            disk.store(&key, &shared);
        }
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, shared);
    }

    /// Returns `true` when either tier holds the key.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
            || self.disk.as_ref().is_some_and(|disk| disk.contains(key))
    }

    /// Number of entries held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no entries are held in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
