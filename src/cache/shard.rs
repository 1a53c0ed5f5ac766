//! Shard Module
//!
//! Independently locked partitions of the key space, and the fixed-size
//! table that routes keys to them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::cache::entry::CacheItem;
use crate::cache::hash::route;
use crate::error::{CacheError, Result};

// == Shard ==
/// One bucket of the key space behind its own reader/writer lock.
///
/// The item map is only mutated while the write lock is held.
#[derive(Debug)]
pub struct Shard<V> {
    /// Position in the table, diagnostic only
    id: usize,
    items: RwLock<HashMap<String, CacheItem<V>>>,
}

impl<V> Shard<V> {
    fn new(id: usize) -> Self {
        Self {
            id,
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Position of this shard in its table.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns a copy of the stored item, expired or not.
    pub fn get(&self, key: &str) -> Option<CacheItem<V>>
    where
        V: Clone,
    {
        self.items.read().get(key).cloned()
    }

    /// Stores `item`, replacing whatever was there.
    pub fn set(&self, key: String, item: CacheItem<V>) {
        self.items.write().insert(key, item);
    }

    /// Removes and returns the stored item, expired or not.
    pub fn delete(&self, key: &str) -> Option<CacheItem<V>> {
        self.items.write().remove(key)
    }

    // == Upsert ==
    /// Atomic read-modify-write under the write lock.
    ///
    /// `update` receives the live value, or None when the key is absent or
    /// expired, and returns the value to store with a fresh deadline. It runs
    /// while the lock is held: it must not block and must not touch this
    /// cache again. If it panics the stored item is left untouched.
    pub fn upsert<F>(&self, key: &str, ttl: Duration, update: F)
    where
        V: Clone,
        F: FnOnce(Option<V>) -> V,
    {
        let mut items = self.items.write();
        let now = Instant::now();

        let old = items
            .get(key)
            .filter(|item| !item.is_expired_at(now))
            .map(|item| item.value.clone());

        let item = CacheItem {
            value: update(old),
            expires_at: if ttl.is_zero() {
                None
            } else {
                now.checked_add(ttl)
            },
        };
        match items.get_mut(key) {
            Some(slot) => *slot = item,
            None => {
                items.insert(key.to_string(), item);
            }
        }
    }

    // == Sweep ==
    /// Removes every item expired at `now` and returns the removed pairs.
    ///
    /// Callers report the pairs after the lock has been released.
    pub fn sweep(&self, now: Instant) -> Vec<(String, V)> {
        let mut items = self.items.write();

        let expired_keys: Vec<String> = items
            .iter()
            .filter(|(_, item)| item.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired_keys
            .into_iter()
            .filter_map(|key| items.remove_entry(&key))
            .map(|(key, item)| (key, item.value))
            .collect()
    }

    /// Number of stored items, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

// == Shard Table ==
/// Fixed-size ordered collection of shards.
///
/// The size never changes, so a key always routes to the same shard.
#[derive(Debug)]
pub struct ShardTable<V> {
    shards: Box<[Shard<V>]>,
}

impl<V> ShardTable<V> {
    /// Creates `size` empty shards. Fails if `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            shards: (0..size).map(Shard::new).collect(),
        })
    }

    /// Index of the shard owning `key`.
    pub fn index_for(&self, key: &str) -> usize {
        route(key, self.shards.len())
    }

    /// The shard owning `key`.
    pub fn shard_for(&self, key: &str) -> &Shard<V> {
        &self.shards[self.index_for(key)]
    }

    /// All shards, in table order.
    pub fn shards(&self) -> &[Shard<V>] {
        &self.shards
    }

    /// Number of shards.
    pub(crate) fn len(&self) -> usize {
        self.shards.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::thread::sleep;

    fn item(value: &str, ttl: Duration) -> CacheItem<String> {
        CacheItem::new(value.to_string(), ttl)
    }

    #[test]
    fn test_table_rejects_zero() {
        assert!(matches!(
            ShardTable::<String>::new(0),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_table_sizes() {
        for size in [1, 16, 128] {
            let table = ShardTable::<String>::new(size).unwrap();
            assert_eq!(table.len(), size);
            assert_eq!(table.shards().len(), size);
            for (i, shard) in table.shards().iter().enumerate() {
                assert_eq!(shard.id(), i);
            }
        }
    }

    #[test]
    fn test_shard_for_stable() {
        let table1 = ShardTable::<String>::new(1).unwrap();
        assert_eq!(table1.shard_for("foo").id(), table1.shard_for("bar").id());

        let a = ShardTable::<String>::new(128).unwrap();
        let b = ShardTable::<u64>::new(128).unwrap();
        for key in ["foo", "bar", "baz", "hello"] {
            assert_eq!(a.shard_for(key).id(), a.shard_for(key).id());
            assert_eq!(a.index_for(key), b.index_for(key));
        }
        assert_ne!(a.index_for("foo"), a.index_for("bar"));
    }

    #[test]
    fn test_shard_set_get_delete() {
        let shard = Shard::new(0);
        assert!(shard.get("foo").is_none());

        shard.set("foo".to_string(), item("bar", Duration::ZERO));
        assert_eq!(shard.get("foo").unwrap().value, "bar");
        assert_eq!(shard.len(), 1);

        shard.set("foo".to_string(), item("baz", Duration::ZERO));
        assert_eq!(shard.get("foo").unwrap().value, "baz");
        assert_eq!(shard.len(), 1);

        assert_eq!(shard.delete("foo").unwrap().value, "baz");
        assert!(shard.delete("foo").is_none());
        assert!(shard.is_empty());
    }

    #[test]
    fn test_shard_get_ignores_expiration() {
        let shard = Shard::new(0);
        shard.set("foo".to_string(), item("bar", Duration::from_millis(1)));
        sleep(Duration::from_millis(5));

        let stored = shard.get("foo").unwrap();
        assert!(stored.is_expired());
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_upsert_branches() {
        let shard: Shard<String> = Shard::new(0);

        shard.upsert("foo", Duration::ZERO, |old| {
            assert!(old.is_none());
            "one".to_string()
        });
        shard.upsert("foo", Duration::from_millis(5), |old| {
            assert_eq!(old.as_deref(), Some("one"));
            "two".to_string()
        });
        assert!(shard.get("foo").unwrap().expires_at.is_some());

        sleep(Duration::from_millis(10));
        shard.upsert("foo", Duration::ZERO, |old| {
            assert!(old.is_none(), "expired value must not be passed");
            "three".to_string()
        });
        let stored = shard.get("foo").unwrap();
        assert_eq!(stored.value, "three");
        assert!(stored.expires_at.is_none());
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_upsert_panic_keeps_item() {
        let shard: Shard<String> = Shard::new(0);
        shard.set("foo".to_string(), item("bar", Duration::ZERO));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            shard.upsert("foo", Duration::ZERO, |_| panic!("update failed"));
        }));
        assert!(result.is_err());

        assert_eq!(shard.get("foo").unwrap().value, "bar");
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_sweep() {
        let shard = Shard::new(0);
        shard.set("a".to_string(), item("1", Duration::from_millis(1)));
        shard.set("b".to_string(), item("2", Duration::from_secs(60)));
        shard.set("c".to_string(), item("3", Duration::ZERO));
        sleep(Duration::from_millis(5));

        let removed = shard.sweep(Instant::now());
        assert_eq!(removed, vec![("a".to_string(), "1".to_string())]);
        assert_eq!(shard.len(), 2);
        assert!(shard.sweep(Instant::now()).is_empty());
    }

    #[test]
    fn test_shard_lock_blocks_same_shard() {
        let table = Arc::new(ShardTable::<String>::new(1).unwrap());
        let guard = table.shard_for("foo1").items.write();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                table
                    .shard_for("foo2")
                    .set("bar".to_string(), item("mark2", Duration::ZERO));
                tx.send(()).unwrap();
            })
        };

        assert!(
            rx.recv_timeout(Duration::from_millis(20)).is_err(),
            "writer should wait for the held lock"
        );
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn test_shard_lock_independent_shards() {
        let table = Arc::new(ShardTable::<String>::new(128).unwrap());
        assert_ne!(table.index_for("foo"), table.index_for("bar"));
        let _guard = table.shard_for("foo").items.write();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                table
                    .shard_for("bar")
                    .set("bar".to_string(), item("mark", Duration::ZERO));
                tx.send(()).unwrap();
            })
        };

        rx.recv_timeout(Duration::from_secs(5))
            .expect("other shard must not be blocked");
        worker.join().unwrap();
    }
}
