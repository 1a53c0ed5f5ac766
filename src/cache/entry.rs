//! Cache Entry Module
//!
//! Defines the immutable item stored per key, with its expiration deadline.

use std::time::{Duration, Instant};

// == Cache Item ==
/// A single stored value with its expiration deadline.
///
/// Items are never mutated in place; every write replaces the whole item.
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    /// The stored value
    pub value: V,
    /// Expiration deadline, None = never expires
    pub expires_at: Option<Instant>,
}

impl<V> CacheItem<V> {
    // == Constructor ==
    /// Creates a new item expiring `ttl` after now.
    ///
    /// A zero `ttl` yields an item that never expires.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: deadline(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the item has expired relative to the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks if the item has expired relative to `now`.
    ///
    /// An item is alive while `now < expires_at`; at the deadline itself it is
    /// already expired.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if the item never expires.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}

/// Resolves a TTL into an absolute deadline computed once, at call time.
pub(crate) fn deadline(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Instant::now().checked_add(ttl)
    }
}
