//! Shard routing
//!
//! FNV-1a over the key's bytes. Unseeded, so every cache instance with the
//! same shard count routes a key to the same shard.

const OFFSET32: u32 = 2_166_136_261;
const PRIME32: u32 = 16_777_619;

/// 32-bit FNV-1a hash of `bytes`.
pub fn fnv32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(OFFSET32, |hash, &b| (hash ^ u32::from(b)).wrapping_mul(PRIME32))
}

/// Maps `key` to a shard index in `[0, size)`.
///
/// `size` must be positive; [`ShardTable`](super::shard::ShardTable) checks
/// this at construction.
pub fn route(key: &str, size: usize) -> usize {
    fnv32(key.as_bytes()) as usize % size
}
