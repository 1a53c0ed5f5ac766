//! Cache Module
//!
//! Sharded in-memory storage with lazy and active TTL expiration.

mod entry;
mod hash;
mod shard;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheItem;
pub use hash::{fnv32, route};
pub use shard::{Shard, ShardTable};
pub use stats::CacheStats;
pub use store::Cache;

// == Public Constants ==
/// Number of shards used when none is configured
pub const DEFAULT_SHARD_COUNT: usize = 32;
