//! [`TlruCache`] — mutex-guarded LRU map with access timestamps.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::recency::RecencyList;
use crate::Cache;

/// Hit/miss/eviction counters since creation or the last [`Cache::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Inner<V> {
    /// `0` disables eviction.
    capacity: usize,
    index: HashMap<String, usize>,
    list: RecencyList<V>,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn evict_oldest(&mut self) {
        if let Some(slot) = self.list.pop_back() {
            self.index.remove(&slot.key);
            self.stats.evictions += 1;
            tracing::debug!(key = %slot.key, "cache eviction");
        }
    }

    fn shrink_to_capacity(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.list.len() > self.capacity {
            self.evict_oldest();
        }
    }
}

/// Bounded least-recently-used cache keyed by template name.
///
/// Every operation holds one lock for the whole map + recency-list update;
/// a lookup reorders the list, so there is no separate reader path.
/// A capacity of `0` means unbounded.
pub struct TlruCache<V> {
    inner: Mutex<Inner<V>>,
    on: AtomicBool,
}

impl<V: Clone> TlruCache<V> {
    /// An enabled cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                index: HashMap::new(),
                list: RecencyList::new(),
                stats: CacheStats::default(),
            }),
            on: AtomicBool::new(true),
        }
    }

    /// Set the advisory enable flag, builder style.
    pub fn with_caching(self, on: bool) -> Self {
        self.on.store(on, Ordering::Relaxed);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().index.contains_key(key)
    }

    /// When `key` was last added or hit, without touching its recency.
    pub fn last_access(&self, key: &str) -> Option<DateTime<Utc>> {
        let inner = self.lock();
        let idx = *inner.index.get(key)?;
        inner.list.get(idx).map(|slot| slot.last_access)
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Change the bound, evicting least recently used entries if needed.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        inner.capacity = capacity;
        inner.shrink_to_capacity();
    }

    /// Cached keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lock().list.keys()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl<V> fmt::Debug for TlruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TlruCache")
            .field("len", &inner.list.len())
            .field("capacity", &inner.capacity)
            .field("on", &self.on.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V: Clone + Send> Cache<V> for TlruCache<V> {
    fn add(&self, key: &str, value: V) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let now = Utc::now();
        if let Some(&idx) = inner.index.get(key) {
            inner.list.replace(idx, value, now);
            return;
        }
        let idx = inner.list.push_front(key.to_owned(), value, now);
        inner.index.insert(key.to_owned(), idx);
        if inner.capacity != 0 && inner.list.len() > inner.capacity {
            inner.evict_oldest();
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.index.get(key) {
            Some(&idx) => {
                inner.list.touch(idx, Utc::now());
                inner.stats.hits += 1;
                inner.list.get(idx).map(|slot| slot.value.clone())
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if let Some(idx) = inner.index.remove(key) {
            inner.list.remove(idx);
        }
    }

    /// Drop every entry, reset the counters, and make the cache unbounded.
    fn clear(&self) {
        let mut inner = self.lock();
        inner.list.clear();
        inner.index.clear();
        inner.capacity = 0;
        inner.stats = CacheStats::default();
    }

    fn on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    fn set_caching(&self, on: bool) {
        self.on.store(on, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let cache = TlruCache::new(0);
        cache.add("testing/template/1", "t1");
        assert_eq!(cache.get("testing/template/1"), Some("t1"));
        assert_eq!(cache.get("testing/template/missing"), None);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
    }

    #[test]
    fn re_adding_replaces_without_growing() {
        let cache = TlruCache::new(2);
        cache.add("a", 1);
        cache.add("b", 2);
        cache.add("a", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["a", "b"]);
        assert_eq!(cache.get("a"), Some(3));
    }

    #[test]
    fn contains_does_not_touch_recency() {
        let cache = TlruCache::new(2);
        cache.add("a", 1);
        cache.add("b", 2);
        assert!(cache.contains("a"));
        cache.add("c", 3);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn set_capacity_shrinks() {
        let cache = TlruCache::new(0);
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.add(k, i);
        }
        cache.set_capacity(2);
        assert_eq!(cache.keys(), vec!["d", "c"]);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn hit_rate_percentage() {
        let stats = CacheStats { hits: 3, misses: 1, evictions: 0 };
        assert!((stats.hit_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
