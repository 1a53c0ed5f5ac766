//! Concache - A concurrent in-process cache with TTL expiration
//!
//! Keys are spread over independently locked shards by FNV-1a hash. Expired
//! entries are hidden on read and removed by explicit sweeps or by an
//! optional background janitor running on Tokio.
//!
//! ```
//! use std::time::Duration;
//! use concache::{Cache, CacheConfig};
//!
//! let cache: Cache<String> = Cache::new(CacheConfig::new().with_shard_count(8)).unwrap();
//! cache.set("foo", "bar".to_string(), Duration::from_secs(10));
//! assert_eq!(cache.get("foo").as_deref(), Some("bar"));
//!
//! cache.upsert_no_expire("hits", |old| {
//!     let n: u64 = old.and_then(|v| v.parse().ok()).unwrap_or(0);
//!     (n + 1).to_string()
//! });
//! assert_eq!(cache.count(), 2);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheItem, CacheStats, DEFAULT_SHARD_COUNT};
pub use config::{CacheConfig, RemovalCallback};
pub use error::{CacheError, Result};
pub use tasks::Janitor;
