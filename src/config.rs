//! Configuration Module
//!
//! Construction options for a [`Cache`](crate::cache::Cache), with an
//! environment-variable loader for the numeric options.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::DEFAULT_SHARD_COUNT;
use crate::error::{CacheError, Result};

/// Callback invoked with the key and value of a removed entry.
pub type RemovalCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

/// Cache configuration parameters.
///
/// Numeric values can be loaded from environment variables; callbacks are
/// attached with the `with_*` builder methods.
pub struct CacheConfig<V> {
    /// Number of independently locked shards, must be positive
    pub shard_count: usize,
    /// TTL used by `set_default` / `upsert_default`, None = never expire
    pub default_ttl: Option<Duration>,
    /// Janitor tick period, None = lazy expiration only
    pub cleanup_interval: Option<Duration>,
    /// Invoked once per entry removed by a sweep
    pub on_evicted: Option<RemovalCallback<V>>,
    /// Invoked once per entry removed by an explicit delete
    pub on_deleted: Option<RemovalCallback<V>>,
}

impl<V> CacheConfig<V> {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            default_ttl: None,
            cleanup_interval: None,
            on_evicted: None,
            on_deleted: None,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CONCACHE_SHARD_COUNT` - Number of shards (default: 32)
    /// - `CONCACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 0, never expire)
    /// - `CONCACHE_CLEANUP_INTERVAL_MS` - Janitor interval in milliseconds (default: 0, disabled)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(count) = parse_var::<usize, _>(&lookup, "CONCACHE_SHARD_COUNT")? {
            config.shard_count = count;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "CONCACHE_DEFAULT_TTL_MS")? {
            config = config.with_default_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "CONCACHE_CLEANUP_INTERVAL_MS")? {
            config = config.with_cleanup_interval(Duration::from_millis(ms));
        }
        Ok(config)
    }

    /// Sets the number of shards.
    pub fn with_shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Sets the default TTL. A zero duration means never expire.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = non_zero(ttl);
        self
    }

    /// Sets the janitor interval. A zero duration disables the janitor.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = non_zero(interval);
        self
    }

    /// Sets the callback fired for entries removed by `delete_expired`.
    pub fn with_on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(callback));
        self
    }

    /// Sets the callback fired for entries removed by `delete`.
    pub fn with_on_deleted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.on_deleted = Some(Arc::new(callback));
        self
    }

    /// Rejects configurations that would break shard routing.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for CacheConfig<V> {
    fn clone(&self) -> Self {
        Self {
            shard_count: self.shard_count,
            default_ttl: self.default_ttl,
            cleanup_interval: self.cleanup_interval,
            on_evicted: self.on_evicted.clone(),
            on_deleted: self.on_deleted.clone(),
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("shard_count", &self.shard_count)
            .field("default_ttl", &self.default_ttl)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("on_evicted", &self.on_evicted.is_some())
            .field("on_deleted", &self.on_deleted.is_some())
            .finish()
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::Env {
                var: var.to_string(),
                value,
            }),
    }
}
