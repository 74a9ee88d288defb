//! Generic bounded LRU cache with a strict `size <= capacity` invariant.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache as RawLruCache;
use parking_lot::Mutex;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// `size / capacity`, in `[0, 1]`.
    pub utilization: f64,
}

/// A thread-safe bounded map with least-recently-used eviction.
///
/// A single mutex guards the whole structure. `get` promotes its key to
/// most-recently-used; `put` inserts or overwrites and evicts the
/// least-recently-used entry if the insert would exceed `capacity`.
pub struct LruCache<K, V> {
    inner: Mutex<RawLruCache<K, V>>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> LruCache<K, V> {
    /// Creates a cache with the given capacity. Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).expect("LruCache capacity must be non-zero");
        Self {
            inner: Mutex::new(RawLruCache::new(cap)),
            capacity,
        }
    }

    /// Returns a clone of the value for `key`, promoting it to
    /// most-recently-used. `None` on miss.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Inserts or overwrites `key`, promoting it to most-recently-used.
    /// Evicts the least-recently-used entry first if at capacity.
    pub fn put(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    /// Whether `key` is present, without affecting recency order.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// A point-in-time snapshot of size/capacity/utilization. Not
    /// transactionally consistent with any particular `put`.
    pub fn stats(&self) -> CacheStats {
        let size = self.len();
        CacheStats {
            size,
            capacity: self.capacity,
            utilization: size as f64 / self.capacity as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn get_promotes_and_evicts_lru() {
        let cache: LruCache<&str, i32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a"); // promote a; b is now LRU
        cache.put("c", 3); // evicts b

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn overwrite_promotes_without_growing() {
        let cache: LruCache<&str, i32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
    }

    #[test]
    fn stats_reflect_size_and_capacity() {
        let cache: LruCache<&str, i32> = LruCache::new(4);
        cache.put("a", 1);
        cache.put("b", 2);
        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.utilization, 0.5);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache: LruCache<&str, i32> = LruCache::new(2);
        cache.put("a", 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn concurrent_puts_never_exceed_capacity() {
        let cache = Arc::new(LruCache::<u64, u64>::new(16));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..200u64 {
                    let key = t * 1000 + i;
                    cache.put(key, key);
                    assert!(cache.len() <= 16);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }

    #[test]
    fn mixed_interleaving_does_not_deadlock() {
        let cache = Arc::new(LruCache::<u64, u64>::new(8));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..100u64 {
                    cache.put(i, t);
                    cache.get(&i);
                    cache.contains(&i);
                    cache.len();
                    cache.stats();
                    if i % 17 == 0 {
                        cache.clear();
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
