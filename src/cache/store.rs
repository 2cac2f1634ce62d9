// Expiring cache store.
// Typed get/set over an untyped backend with lazy expiry, get-or-compute, and prefetch.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;

use super::backend::{FileBackend, MemoryBackend, StorageBackend};
use super::entry::CacheEntry;

/// Counts gathered by a full scan of the region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Items present in the backend, expired or not.
    pub entries: usize,
    /// Items whose expiry has passed but which have not been evicted yet.
    pub expired: usize,
}

/// Envelope view used when only the expiry matters.
#[derive(Deserialize)]
struct ExpiryStamp {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expiry: DateTime<Utc>,
}

impl ExpiryStamp {
    fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

/// Namespaced, expiring key/value cache. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct ExpiringStore {
    backend: Arc<dyn StorageBackend>,
}

impl ExpiringStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// File-backed store in the configured region, or in-memory without a cache dir.
    pub fn from_config(config: &Config) -> Self {
        match config.region_dir() {
            Some(dir) => {
                debug!(dir = %dir.display(), "Using file cache region");
                Self::new(Arc::new(FileBackend::new(dir)))
            }
            None => {
                warn!("No cache directory available, falling back to in-memory cache");
                Self::in_memory()
            }
        }
    }

    /// Store `value` under `key` for `ttl`. Returns whether the entry was persisted.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if key.is_empty() {
            warn!("Attempted to cache data with an empty key");
            return false;
        }

        match serde_json::to_value(value) {
            Ok(data) => self.set_value(key, data, ttl).await,
            Err(e) => {
                warn!(key, error = %e, "Attempted to cache data that cannot be serialized");
                false
            }
        }
    }

    async fn set_value(&self, key: &str, data: Value, ttl: Duration) -> bool {
        let entry = match serde_json::to_value(CacheEntry::new(data, ttl)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return false;
            }
        };

        match self.backend.set_item(key, entry).await {
            Ok(()) => true,
            Err(e) => {
                error!(key, error = %e, "Cache set error");
                false
            }
        }
    }

    /// Fetch a non-expired value. Expired entries are deleted on the way out.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!(key, error = %e, "Cache get error");
                return None;
            }
        };

        let entry = match CacheEntry::<Value>::deserialize(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed cache entry");
                self.evict(key).await;
                return None;
            }
        };

        if entry.is_expired() {
            self.evict(key).await;
            return None;
        }

        match T::deserialize(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key, error = %e, "Cached data does not match the requested type");
                None
            }
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.backend.remove_item(key).await {
            warn!(key, error = %e, "Failed to remove stale cache item");
        }
    }

    /// Delete `key`. Missing keys and backend faults are not errors.
    pub async fn remove(&self, key: &str) {
        if key.is_empty() {
            warn!("Attempted to remove cache with an empty key");
            return;
        }

        if let Err(e) = self.backend.remove_item(key).await {
            error!(key, error = %e, "Cache remove error");
        }
    }

    /// Delete every entry in the region.
    pub async fn clear(&self) {
        if let Ok(keys) = self.backend.keys().await {
            info!(entries = keys.len(), "Clearing cache");
        }

        if let Err(e) = self.backend.clear().await {
            error!(error = %e, "Cache clear error");
        }
    }

    /// Return the cached value for `key`, or run `producer` and cache its result.
    ///
    /// With `skip_cache` the producer runs and the cache is neither read nor written.
    /// Producer errors are returned unchanged; a failed write only loses the caching.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Duration,
        skip_cache: bool,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if skip_cache {
            return producer().await;
        }

        if key.is_empty() {
            warn!("Invalid cache key provided, computing without cache");
            return producer().await;
        }

        if let Some(cached) = self.get::<T>(key).await {
            debug!(key, "Cache hit");
            return Ok(cached);
        }

        debug!(key, "Cache miss");
        let fresh = producer().await?;
        if !self.set(key, &fresh, ttl).await {
            warn!(key, "Failed to cache computed data");
        }
        Ok(fresh)
    }

    /// Warm `key` with the producer's result unless a live entry already exists.
    ///
    /// `force` skips the existence check. Null results are not stored and producer
    /// errors are only logged.
    pub async fn prefetch<T, E, F, Fut>(&self, key: &str, producer: F, ttl: Duration, force: bool)
    where
        T: Serialize,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if key.is_empty() {
            warn!("Invalid cache key provided for prefetch");
            return;
        }

        if !force && self.has_live_entry(key).await {
            debug!(key, "Prefetch skipped, entry still valid");
            return;
        }

        let data = match producer().await {
            Ok(data) => data,
            Err(e) => {
                error!(key, error = %e, "Prefetch error");
                return;
            }
        };

        match serde_json::to_value(&data) {
            Ok(Value::Null) => debug!(key, "Prefetch produced no data"),
            Ok(value) => {
                self.set_value(key, value, ttl).await;
            }
            Err(e) => warn!(key, error = %e, "Prefetched data cannot be serialized"),
        }
    }

    /// Run [`prefetch`](Self::prefetch) on a detached task.
    pub fn spawn_prefetch<T, E, F, Fut>(
        &self,
        key: impl Into<String>,
        producer: F,
        ttl: Duration,
        force: bool,
    ) -> JoinHandle<()>
    where
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let store = self.clone();
        let key = key.into();
        tokio::spawn(async move { store.prefetch(&key, producer, ttl, force).await })
    }

    async fn has_live_entry(&self, key: &str) -> bool {
        match self.backend.get_item(key).await {
            Ok(Some(raw)) => ExpiryStamp::from_value(&raw).is_some_and(|s| Utc::now() < s.expiry),
            Ok(None) => false,
            Err(e) => {
                debug!(key, error = %e, "Prefetch existence check failed");
                false
            }
        }
    }

    /// Delete every expired entry. Items without an expiry are left alone.
    pub async fn purge_expired(&self) -> usize {
        let keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "Error purging old cache");
                return 0;
            }
        };

        let now = Utc::now();
        let mut purged = 0;

        for key in keys {
            let expired = match self.backend.get_item(&key).await {
                Ok(Some(raw)) => ExpiryStamp::from_value(&raw).is_some_and(|s| s.expiry <= now),
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read cache item during purge");
                    continue;
                }
            };

            if !expired {
                continue;
            }

            match self.backend.remove_item(&key).await {
                Ok(()) => purged += 1,
                Err(e) => warn!(key = %key, error = %e, "Failed to purge cache item"),
            }
        }

        purged
    }

    /// Scan the region and count live and expired entries.
    pub async fn stats(&self) -> CacheStats {
        let keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "Failed to enumerate cache");
                return CacheStats::default();
            }
        };

        let now = Utc::now();
        let mut stats = CacheStats {
            entries: keys.len(),
            expired: 0,
        };

        for key in keys {
            if let Ok(Some(raw)) = self.backend.get_item(&key).await {
                if ExpiryStamp::from_value(&raw).is_some_and(|s| s.expiry <= now) {
                    stats.expired += 1;
                }
            }
        }

        stats
    }
}

/// Periodically purge expired entries until the returned handle is aborted.
pub fn spawn_sweeper(store: ExpiringStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                info!(purged, "Purged expired cache entries");
            }
        }
    })
}

static GLOBAL: OnceLock<ExpiringStore> = OnceLock::new();

/// Install the process-wide store. Only the first call takes effect.
pub fn init(store: ExpiringStore) -> &'static ExpiringStore {
    GLOBAL.get_or_init(|| store)
}

/// The process-wide store, configured from the environment on first use.
pub fn global() -> &'static ExpiringStore {
    GLOBAL.get_or_init(|| {
        let config = Config::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid cache configuration, using defaults");
            Config::default()
        });
        ExpiringStore::from_config(&config)
    })
}
