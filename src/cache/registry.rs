//! Cache registry - central management for all caches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// Registry key: a name plus the cache's concrete type, so two callers can
/// never see the same name with different key/value types.
type EntryKey = (String, TypeId);

/// Central registry for named typed caches.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<EntryKey, Box<dyn Any + Send + Sync>>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cache registered under `name`, creating it with `config` on
    /// first use.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let key = (name.to_string(), TypeId::of::<TypedCache<K, V>>());

        if let Some(cache) = self.lookup::<K, V>(&key) {
            return cache;
        }

        let mut caches = self.caches.write();
        let entry = caches.entry(key).or_insert_with(|| {
            debug!("Creating cache: {}", name);
            Box::new(TypedCache::<K, V>::new(name, config))
        });
        match entry.downcast_ref::<TypedCache<K, V>>() {
            Some(cache) => cache.clone(),
            // Unreachable: the TypeId in the key pins the boxed type.
            None => TypedCache::new(name, CacheConfig::default()),
        }
    }

    fn lookup<K, V>(&self, key: &EntryKey) -> Option<TypedCache<K, V>>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.caches
            .read()
            .get(key)
            .and_then(|entry| entry.downcast_ref::<TypedCache<K, V>>())
            .cloned()
    }

    /// Number of registered caches.
    pub fn cache_count(&self) -> usize {
        self.caches.read().len()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_names", &caches.keys().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_types_shares_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<u64, String> = registry.get_or_create("names", CacheConfig::default());
        let b: TypedCache<u64, String> = registry.get_or_create("names", CacheConfig::default());

        a.insert(1, "one".into());
        assert_eq!(b.get(&1).as_deref(), Some("one"));
        assert_eq!(registry.cache_count(), 1);
    }

    #[test]
    fn test_same_name_other_types_is_separate() {
        let registry = CacheRegistry::new();
        let a: TypedCache<u64, String> = registry.get_or_create("x", CacheConfig::default());
        let b: TypedCache<u64, i64> = registry.get_or_create("x", CacheConfig::default());

        a.insert(1, "one".into());
        assert_eq!(b.get(&1), None);
        assert_eq!(registry.cache_count(), 2);
    }
}
