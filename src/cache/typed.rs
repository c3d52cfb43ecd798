//! Typed cache handle over Moka.

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::Mutex;

use super::CacheConfig;

/// Named, cloneable handle to a `moka::sync::Cache`. Clones share entries.
///
/// Every write (`insert`, `invalidate`) bumps a generation counter. A reader
/// that loads from the database takes a `ticket()` first and stores the
/// result with `fill()`, which drops it if any write happened in between.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    generation: Arc<Mutex<u64>>,
    name: Arc<str>,
}

// Manual Clone: moka's Cache is already an Arc handle, and K/V need not be Clone.
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generation: Arc::clone(&self.generation),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &str, config: CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .name(name)
            .max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
            generation: Arc::new(Mutex::new(0)),
            name: name.into(),
        }
    }

    /// Store an authoritative value (write-through).
    pub fn insert(&self, key: K, value: V) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.inner.insert(key, value);
    }

    /// Generation to hand back to `fill` after a database load.
    pub fn ticket(&self) -> u64 {
        *self.generation.lock()
    }

    /// Store a loaded value unless a write happened since `ticket`.
    /// Returns whether the value was cached.
    pub fn fill(&self, key: K, value: V, ticket: u64) -> bool {
        let generation = self.generation.lock();
        if *generation != ticket {
            return false;
        }
        self.inner.insert(key, value);
        true
    }

    /// `Some(value)` if the key exists and hasn't expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn invalidate(&self, key: &K) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.inner.invalidate(key);
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_invalidate() {
        let cache: TypedCache<i64, Vec<u64>> = TypedCache::new("t", CacheConfig::roster());
        cache.insert(1, vec![2, 3]);
        assert!(cache.contains(&1));
        assert_eq!(cache.get(&1), Some(vec![2, 3]));

        cache.invalidate(&1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_fill_after_concurrent_invalidate_is_dropped() {
        let cache: TypedCache<&'static str, Vec<i64>> =
            TypedCache::new("lists", CacheConfig::roster());

        // A reader misses and starts loading the old list.
        let ticket = cache.ticket();
        let stale = vec![1, 2];

        // A writer adds an entry and invalidates before the reader finishes.
        cache.invalidate(&"generic");

        assert!(!cache.fill("generic", stale, ticket));
        assert_eq!(cache.get(&"generic"), None);

        // The next load sees no intervening write and is cached.
        let ticket = cache.ticket();
        assert!(cache.fill("generic", vec![1, 2, 3], ticket));
        assert_eq!(cache.get(&"generic"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_fill_does_not_overwrite_write_through() {
        let cache: TypedCache<u64, Option<String>> =
            TypedCache::new("names", CacheConfig::per_user());

        let ticket = cache.ticket();
        cache.insert(7, Some("Boss".to_string()));

        assert!(!cache.fill(7, None, ticket));
        assert_eq!(cache.get(&7), Some(Some("Boss".to_string())));
    }

    #[test]
    fn test_clones_share_generation() {
        let cache: TypedCache<i64, i64> = TypedCache::new("shared", CacheConfig::default());
        let other = cache.clone();

        let ticket = cache.ticket();
        other.invalidate(&1);
        assert!(!cache.fill(1, 10, ticket));
    }
}
