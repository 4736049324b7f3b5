// =====================================================================================
// QUERY CACHE SERVICE - TTL MEMOIZATION WITH AMORTIZED EVICTION
// =====================================================================================

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::models::CacheStats;
use crate::services::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub cleanup_interval: u64,
    pub hard_expiry: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            cleanup_interval: 100,
            hard_expiry: Duration::from_secs(60),
        }
    }
}

/// Identity of one memoized call: function name, positional arguments and
/// keyword arguments (kept sorted by name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    function: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.kwargs.insert(name.into(), value.to_string());
        self
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Hex SHA-256 of `function|args|kwargs`, each list joined with `|`.
    pub fn digest(&self) -> String {
        let kwargs: Vec<String> = self
            .kwargs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        let raw = format!("{}|{}|{}", self.function, self.args.join("|"), kwargs.join("|"));
        format!("{:x}", Sha256::digest(raw.as_bytes()))
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
    // Breaks ties between entries stored at the same instant.
    seq: u64,
}

pub struct QueryCache {
    config: CacheConfig,
    store: RwLock<HashMap<String, CacheEntry>>,
    sweep_calls: AtomicU64,
    insert_seq: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store: RwLock::new(HashMap::new()),
            sweep_calls: AtomicU64::new(0),
            insert_seq: AtomicU64::new(0),
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cached value for `key` when it is younger than `ttl`,
    /// otherwise runs `compute` and caches its result.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, ttl: Duration, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let result = self
            .try_get_or_compute(key, ttl, move || async move { Ok::<T, Infallible>(compute().await) })
            .await;

        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute). Errors are
    /// returned unchanged and never cached.
    #[instrument(skip(self, compute), fields(function = %key.function()))]
    pub async fn try_get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let digest = key.digest();

        if let Some(value) = self.lookup(&digest, ttl).await {
            debug!("Query cache hit");
            return Ok(value);
        }

        debug!("Query cache miss");
        let value = compute().await?;
        self.insert(digest, &value).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, digest: &str, ttl: Duration) -> Option<T> {
        let store = self.store.read().await;
        let entry = store.get(digest)?;

        let age = self.clock.now().saturating_duration_since(entry.inserted_at);
        if age >= ttl {
            return None;
        }

        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Cached value has unexpected shape, recomputing: {}", e);
                None
            }
        }
    }

    async fn insert<T: Serialize>(&self, digest: String, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Query result is not cacheable: {}", e);
                return;
            }
        };

        let size = {
            let mut store = self.store.write().await;
            let seq = self.insert_seq.fetch_add(1, Ordering::Relaxed);
            store.insert(
                digest,
                CacheEntry {
                    value,
                    inserted_at: self.clock.now(),
                    seq,
                },
            );
            store.len()
        };

        self.cleanup_expired_entries(size > self.config.max_entries).await;
    }

    /// Purges entries past the hard expiry horizon and, when the store is
    /// still over capacity, the oldest entries down to half capacity.
    ///
    /// Unless `force` is set the sweep only runs on every
    /// `cleanup_interval`-th call. Returns the number of entries removed.
    pub async fn cleanup_expired_entries(&self, force: bool) -> usize {
        if !force {
            let calls = self.sweep_calls.fetch_add(1, Ordering::Relaxed) + 1;
            if calls % self.config.cleanup_interval.max(1) != 0 {
                return 0;
            }
        }

        let now = self.clock.now();
        let hard_expiry = self.config.hard_expiry;
        let mut store = self.store.write().await;
        let before = store.len();

        store.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) <= hard_expiry);

        if store.len() > self.config.max_entries {
            let target = self.config.max_entries / 2;
            let mut by_age: Vec<(Instant, u64, String)> = store
                .iter()
                .map(|(digest, entry)| (entry.inserted_at, entry.seq, digest.clone()))
                .collect();
            by_age.sort_unstable_by_key(|(inserted_at, seq, _)| (*inserted_at, *seq));

            let excess = store.len() - target;
            for (_, _, digest) in by_age.into_iter().take(excess) {
                store.remove(&digest);
            }
            info!("Query cache over capacity, trimmed to {} entries", store.len());
        }

        let removed = before - store.len();
        if removed > 0 {
            debug!("Query cache sweep removed {} entries", removed);
        }
        removed
    }

    /// Empties the store; returns how many entries were dropped.
    pub async fn clear_cache(&self) -> usize {
        let mut store = self.store.write().await;
        let cleared = store.len();
        store.clear();
        info!("Query cache cleared ({} entries)", cleared);
        cleared
    }

    pub async fn get_cache_stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let now = self.clock.now();

        let oldest_entry_age_seconds = store
            .values()
            .map(|entry| now.saturating_duration_since(entry.inserted_at))
            .max()
            .map(|age| age.as_secs_f64())
            .unwrap_or(0.0);

        CacheStats {
            total_entries: store.len(),
            oldest_entry_age_seconds,
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

/// A query function bound to a cache under a fixed identity and TTL.
#[derive(Clone)]
pub struct CachedQuery {
    cache: Arc<QueryCache>,
    function: String,
    ttl: Duration,
}

impl CachedQuery {
    pub fn new(cache: Arc<QueryCache>, function: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            function: function.into(),
            ttl,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Runs `compute` through the cache. `args` adds the call's arguments to
    /// a key that already carries this query's function name.
    pub async fn call<T, A, F, Fut>(&self, args: A, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        A: FnOnce(CacheKey) -> CacheKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = self.build_key(args);
        self.cache.get_or_compute(&key, self.ttl, compute).await
    }

    pub async fn try_call<T, E, A, F, Fut>(&self, args: A, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        A: FnOnce(CacheKey) -> CacheKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.build_key(args);
        self.cache.try_get_or_compute(&key, self.ttl, compute).await
    }

    fn build_key<A>(&self, args: A) -> CacheKey
    where
        A: FnOnce(CacheKey) -> CacheKey,
    {
        let mut key = args(CacheKey::new(self.function.clone()));
        // The bound function name always wins over whatever `args` returned.
        key.function.clone_from(&self.function);
        key
    }
}
