//! LRU cache with a release callback
//!
//! [`DisposingLruCache`] wraps [`LruCache`] for values that need
//! teardown when the cache stops holding them, such as raw pointers,
//! file descriptors or pooled connections. Whatever the cache displaces
//! (eviction, overwrite, [`clear`](DisposingLruCache::clear), drop) is
//! handed to the disposer exactly once; values handed back to the
//! caller ([`remove`](DisposingLruCache::remove)) are not.

use std::hash::Hash;

use tracing::debug;

use crate::error::Result;

use super::lru::LruCache;
use super::stats::CacheStats;

/// LRU cache that runs a disposer on every value it stops holding
///
/// Without a disposer, displaced values are simply dropped, which
/// already suffices for types with a meaningful `Drop`. The disposer is
/// for values whose teardown is not their `Drop`: freeing through an
/// allocator, returning to a pool, closing an external resource.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use poolkit::DisposingLruCache;
///
/// let disposed = Arc::new(Mutex::new(Vec::new()));
/// let log = Arc::clone(&disposed);
/// let mut cache = DisposingLruCache::with_disposer(2, move |v| log.lock().unwrap().push(v))?;
///
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.put("c", 3); // evicts 1
/// drop(cache); // disposes 2 then 3, least recently used first
///
/// assert_eq!(*disposed.lock().unwrap(), vec![1, 2, 3]);
/// # Ok::<(), poolkit::MemoryError>(())
/// ```
pub struct DisposingLruCache<K: Eq + Hash + Clone, V> {
    inner: LruCache<K, V>,
    disposer: Option<Box<dyn FnMut(V) + Send>>,
}

impl<K: Eq + Hash + Clone, V> DisposingLruCache<K, V> {
    /// Creates a cache that drops displaced values
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self { inner: LruCache::new(capacity)?, disposer: None })
    }

    /// Creates a cache that runs `disposer` on displaced values
    pub fn with_disposer(
        capacity: usize,
        disposer: impl FnMut(V) + Send + 'static,
    ) -> Result<Self> {
        Ok(Self { inner: LruCache::new(capacity)?, disposer: Some(Box::new(disposer)) })
    }

    /// Looks a key up and marks it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Looks a key up without disturbing recency or counters
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    /// Whether the key is cached, without disturbing recency or counters
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Inserts or overwrites an entry, disposing whatever it displaces
    ///
    /// An overwritten value under the same key and a value evicted under
    /// capacity pressure are both disposed.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(displaced) = self.inner.put(key, value) {
            self.dispose(displaced);
        }
    }

    /// Removes an entry, handing ownership back without disposing
    ///
    /// The caller takes over the value's teardown.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    /// Disposes every entry, least recently used first; counters are kept
    pub fn clear(&mut self) {
        let drained = self.inner.len();
        while let Some((_, value)) = self.inner.pop_lru() {
            self.dispose(value);
        }
        debug!(drained, "disposing cache cleared");
    }

    /// Number of entries currently cached
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Hit rate as a percentage, 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        self.inner.hit_rate()
    }

    /// Snapshot of the cache's counters
    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// Resets hit, miss and eviction counters; entries are kept
    pub fn reset_stats(&mut self) {
        self.inner.reset_stats();
    }

    fn dispose(&mut self, value: V) {
        match self.disposer.as_mut() {
            Some(disposer) => disposer(value),
            None => drop(value),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Drop for DisposingLruCache<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Eq + Hash + Clone, V> std::fmt::Debug for DisposingLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposingLruCache")
            .field("has_disposer", &self.disposer.is_some())
            .finish_non_exhaustive()
    }
}
