//! Cache Store Module
//!
//! The public cache facade: routes every key to its shard, resolves TTLs,
//! fires removal callbacks and owns the optional janitor.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::entry::CacheItem;
use crate::cache::shard::ShardTable;
use crate::cache::stats::{CacheStats, StatsCounters};
use crate::config::{CacheConfig, RemovalCallback};
use crate::error::Result;
use crate::tasks::Janitor;

/// State shared between the facade and the janitor task.
struct CacheShared<V> {
    table: ShardTable<V>,
    stats: StatsCounters,
    on_evicted: Option<RemovalCallback<V>>,
}

impl<V> CacheShared<V> {
    /// Sweeps every shard in table order, one lock at a time, then reports
    /// the removed entries once all locks are released.
    fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let removed: Vec<(String, V)> = self
            .table
            .shards()
            .iter()
            .flat_map(|shard| shard.sweep(now))
            .collect();

        self.stats.record_evictions(removed.len());
        if let Some(on_evicted) = &self.on_evicted {
            for (key, value) in &removed {
                on_evicted(key, value);
            }
        }
        removed.len()
    }
}

// == Cache ==
/// Concurrent sharded key/value cache with TTL expiration.
///
/// Every operation locks only the shard owning the key. Expired entries are
/// hidden from [`get`](Cache::get) but stay stored, and counted, until
/// [`delete`](Cache::delete) or [`delete_expired`](Cache::delete_expired)
/// removes them. Share a cache between threads with `Arc<Cache<V>>`.
///
/// When a cleanup interval is configured a [`Janitor`] sweeps in the
/// background. Call [`shutdown`](Cache::shutdown) to stop it and wait for it;
/// dropping the cache aborts it without waiting.
pub struct Cache<V> {
    shared: Arc<CacheShared<V>>,
    default_ttl: Duration,
    on_deleted: Option<RemovalCallback<V>>,
    janitor: Mutex<Option<Janitor>>,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache from `config`.
    ///
    /// # Errors
    /// - [`CacheError::InvalidConfig`](crate::CacheError::InvalidConfig) if the
    ///   shard count is zero
    /// - [`CacheError::NoRuntime`](crate::CacheError::NoRuntime) if a cleanup
    ///   interval is set and no Tokio runtime is running
    pub fn new(config: CacheConfig<V>) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(CacheShared {
            table: ShardTable::new(config.shard_count)?,
            stats: StatsCounters::default(),
            on_evicted: config.on_evicted,
        });

        let janitor = match config.cleanup_interval {
            Some(interval) => Some(Janitor::spawn(
                interval,
                Arc::downgrade(&shared),
                CacheShared::delete_expired,
            )?),
            None => None,
        };

        debug!(
            "Cache created: shards={}, default_ttl={:?}, cleanup_interval={:?}",
            config.shard_count, config.default_ttl, config.cleanup_interval
        );

        Ok(Self {
            shared,
            default_ttl: config.default_ttl.unwrap_or(Duration::ZERO),
            on_deleted: config.on_deleted,
            janitor: Mutex::new(janitor),
        })
    }

    /// Creates a cache with 32 shards, no default TTL and no janitor.
    pub fn with_defaults() -> Result<Self> {
        Self::new(CacheConfig::new())
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The deadline is `now + ttl`; a zero `ttl` never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        self.shared
            .table
            .shard_for(&key)
            .set(key, CacheItem::new(value, ttl));
        self.shared.stats.record_set();
    }

    /// Stores `value` with the configured default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Stores `value` without expiration.
    pub fn set_no_expire(&self, key: impl Into<String>, value: V) {
        self.set(key, value, Duration::ZERO);
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// Returns None if the key is absent or expired. Expired entries are not
    /// removed and no callback fires.
    pub fn get(&self, key: &str) -> Option<V> {
        let value = self
            .shared
            .table
            .shard_for(key)
            .get(key)
            .filter(|item| !item.is_expired())
            .map(|item| item.value);

        match value {
            Some(_) => self.shared.stats.record_hit(),
            None => self.shared.stats.record_miss(),
        }
        value
    }

    // == Delete ==
    /// Removes `key`, expired or not, and returns its value.
    ///
    /// Fires `on_deleted` once, after the shard lock is released. Returns None
    /// only when nothing was stored.
    pub fn delete(&self, key: &str) -> Option<V> {
        let item = self.shared.table.shard_for(key).delete(key)?;
        self.shared.stats.record_delete();

        if let Some(on_deleted) = &self.on_deleted {
            on_deleted(key, &item.value);
        }
        Some(item.value)
    }

    // == Upsert ==
    /// Atomically replaces the value for `key` with `update(old)`.
    ///
    /// `old` is None when the key is absent or expired. The result is stored
    /// with a fresh deadline in either case. `update` runs under the shard's
    /// write lock, so it must be quick and must not call back into this cache.
    pub fn upsert<F>(&self, key: &str, ttl: Duration, update: F)
    where
        F: FnOnce(Option<V>) -> V,
    {
        self.shared.table.shard_for(key).upsert(key, ttl, update);
        self.shared.stats.record_set();
    }

    /// [`upsert`](Cache::upsert) with the configured default TTL.
    pub fn upsert_default<F>(&self, key: &str, update: F)
    where
        F: FnOnce(Option<V>) -> V,
    {
        self.upsert(key, self.default_ttl, update);
    }

    /// [`upsert`](Cache::upsert) without expiration.
    pub fn upsert_no_expire<F>(&self, key: &str, update: F)
    where
        F: FnOnce(Option<V>) -> V,
    {
        self.upsert(key, Duration::ZERO, update);
    }

    // == Count ==
    /// Number of stored entries, including expired entries not yet swept.
    ///
    /// Each shard is counted under its own read lock, so the total is not a
    /// consistent snapshot under concurrent writes.
    pub fn count(&self) -> usize {
        self.shared.table.shards().iter().map(|shard| shard.len()).sum()
    }

    // == Delete Expired ==
    /// Removes every entry expired at call time and returns how many.
    ///
    /// Shards are swept one at a time. `on_evicted` fires once per removed
    /// entry, in sweep order, after every shard lock has been released.
    pub fn delete_expired(&self) -> usize {
        self.shared.delete_expired()
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot(self.count())
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shared.table.len()
    }

    /// Configured default TTL, None = never expire.
    pub fn default_ttl(&self) -> Option<Duration> {
        (!self.default_ttl.is_zero()).then_some(self.default_ttl)
    }

    /// Returns true while a janitor is attached.
    pub fn has_janitor(&self) -> bool {
        self.janitor.lock().is_some()
    }

    // == Shutdown ==
    /// Stops the janitor and waits, bounded, for it to exit.
    ///
    /// Only the first call does anything; later calls and caches without a
    /// janitor return immediately.
    pub async fn shutdown(&self) {
        let janitor = self.janitor.lock().take();
        if let Some(janitor) = janitor {
            janitor.stop().await;
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.shared.table.len())
            .field("default_ttl", &self.default_ttl)
            .field("janitor", &self.janitor.lock().is_some())
            .finish()
    }
}
