//! Cache Store Module
//!
//! On-disk key/value store with one JSON file per key and per-entry TTL.
//! Caching is best-effort: storage failures are logged and degrade to a miss
//! or a no-op, they never reach the caller.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, CacheStats, CacheType, QueryParams};
use crate::config::CacheSettings;
use crate::error::{Result, WeatherError};

/// Extension of entry files inside the cache directory
const ENTRY_EXTENSION: &str = "json";

// == Cache Store ==
/// Content-addressed file cache.
///
/// Writes go through a single lock and an atomic rename, so concurrent
/// writers of the same key never leave a torn file behind; the last writer
/// wins.
#[derive(Debug)]
pub struct CacheStore {
    /// Directory holding `<key>.json` files
    directory: PathBuf,
    /// When false every lookup misses and every write is dropped
    enabled: bool,
    /// Serializes writes, clears and sweeps
    write_lock: Mutex<()>,
    /// Performance statistics
    stats: Mutex<CacheStats>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store rooted at `directory`.
    ///
    /// When enabled, the directory is created if missing. Failure to create
    /// it is logged; later writes will fail and be swallowed.
    pub fn new(directory: impl Into<PathBuf>, enabled: bool) -> Self {
        let directory = directory.into();
        if enabled {
            match fs::create_dir_all(&directory) {
                Ok(()) => debug!(directory = %directory.display(), "Cache directory ready"),
                Err(e) => warn!(
                    directory = %directory.display(),
                    error = %e,
                    "Failed to create cache directory"
                ),
            }
        }

        Self {
            directory,
            enabled,
            write_lock: Mutex::new(()),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Creates a store from the cache section of the configuration.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.directory.clone(), settings.enabled)
    }

    /// Creates a store that never hits and never writes.
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    // == Key Derivation ==
    /// Derives the cache key for a request. Pure; independent of store state.
    pub fn key_for(endpoint: &str, params: &QueryParams, cache_type: CacheType) -> CacheKey {
        CacheKey::derive(endpoint, params, cache_type)
    }

    // == Get ==
    /// Returns the cached value if present and unexpired.
    ///
    /// Expired entries stay on disk until overwritten or swept but are
    /// reported as absent. Read and decode failures count as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Same as [`CacheStore::get`], judged at an explicit instant.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key);
        if !path.exists() {
            self.stats().record_miss();
            return None;
        }

        match read_entry(&path) {
            Ok(entry) if entry.is_valid_at(now) => {
                debug!(key = %key, "Cache hit");
                self.stats().record_hit();
                Some(entry.value)
            }
            Ok(_) => {
                debug!(key = %key, "Cache entry expired");
                self.stats().record_miss();
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache entry, treating as miss");
                self.stats().record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Stores `value` under `key` with the given TTL, replacing any entry.
    ///
    /// The entry is flushed to disk before this returns. Errors are logged
    /// and swallowed.
    pub fn put(&self, key: &CacheKey, value: &Value, ttl_seconds: u64) {
        if !self.enabled {
            return;
        }
        let entry = CacheEntry::new(key.as_str(), value.clone(), ttl_seconds);
        self.put_entry(&entry);
    }

    /// Writes a fully formed entry, keeping its original timestamp.
    pub(crate) fn put_entry(&self, entry: &CacheEntry) {
        if !self.enabled {
            return;
        }

        let _guard = self.lock_writes();
        match self.write_entry(entry) {
            Ok(()) => {
                debug!(key = %entry.key, ttl = entry.ttl_seconds, "Saved data to cache");
                self.stats().record_write();
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "Failed to save data to cache");
                self.stats().record_write_failure();
            }
        }
    }

    // == Clear ==
    /// Removes every entry file. Returns the number removed.
    pub fn clear(&self) -> usize {
        self.remove_matching(|_| true)
    }

    // == Purge Expired ==
    /// Removes entry files that are expired or unreadable.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let removed = self.remove_matching(|path| match read_entry(path) {
            Ok(entry) => !entry.is_valid_at(now),
            Err(_) => true,
        });
        self.stats().record_purged(removed);
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats_snapshot(&self) -> CacheStats {
        self.stats().clone()
    }

    /// Number of entry files currently on disk, valid or not.
    pub fn len(&self) -> usize {
        self.entry_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Internals ==
    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.directory.join(format!("{}.{}", key.as_str(), ENTRY_EXTENSION))
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        let path = self
            .directory
            .join(format!("{}.{}", entry.key, ENTRY_EXTENSION));
        let tmp = self
            .directory
            .join(format!("{}.{}.tmp", entry.key, std::process::id()));

        let body =
            serde_json::to_vec(entry).map_err(|e| WeatherError::CacheIo(e.to_string()))?;
        let mut file = File::create(&tmp).map_err(io_error(&tmp))?;
        file.write_all(&body).map_err(io_error(&tmp))?;
        file.sync_all().map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_error(&path))?;
        Ok(())
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        if !self.enabled {
            return Vec::new();
        }
        match fs::read_dir(&self.directory) {
            Ok(dir) => dir
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
                .collect(),
            Err(e) => {
                warn!(
                    directory = %self.directory.display(),
                    error = %e,
                    "Failed to list cache directory"
                );
                Vec::new()
            }
        }
    }

    fn remove_matching(&self, mut predicate: impl FnMut(&Path) -> bool) -> usize {
        let _guard = self.lock_writes();
        let mut removed = 0;
        for path in self.entry_files() {
            if !predicate(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache entry"),
            }
        }
        if removed > 0 {
            info!(removed, "Removed cache entries");
        }
        removed
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry> {
    let body = fs::read(path).map_err(io_error(path))?;
    serde_json::from_slice(&body)
        .map_err(|e| WeatherError::CacheIo(format!("{}: {e}", path.display())))
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> WeatherError + '_ {
    move |e| WeatherError::CacheIo(format!("{}: {e}", path.display()))
}
