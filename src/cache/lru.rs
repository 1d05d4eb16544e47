//! Generic O(1) least-recently-used cache
//!
//! Recency order is a doubly linked list threaded by index through a
//! slab of nodes, with a `HashMap` from key to slab index. No node is
//! ever reallocated on promotion, so `get`, `put` and `remove` are all
//! O(1) (amortized, through the map).

use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

use crate::error::{MemoryError, Result};

use super::stats::CacheStats;

/// Sentinel terminating the recency list
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    /// Neighbor toward the most recently used end
    prev: usize,
    /// Neighbor toward the least recently used end
    next: usize,
}

/// Least-recently-used cache with a fixed entry capacity
///
/// `get` and `put` mark the touched entry most recently used; when a new
/// key arrives at capacity, the least recently used entry is evicted and
/// its value returned to the caller of [`put`](Self::put). `peek` and
/// [`contains_key`](Self::contains_key) observe without disturbing
/// recency or counters.
///
/// # Example
///
/// ```
/// use poolkit::LruCache;
///
/// let mut cache = LruCache::new(2)?;
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a");
/// cache.put("c", 3); // "b" is now least recently used
/// assert!(cache.contains_key(&"a"));
/// assert!(!cache.contains_key(&"b"));
/// # Ok::<(), poolkit::MemoryError>(())
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    /// Vacant slab indices, reused before the slab grows
    free: Vec<usize>,
    /// Most recently used entry, `NIL` when empty
    head: usize,
    /// Least recently used entry, `NIL` when empty
    tail: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries
    ///
    /// A zero capacity is rejected with
    /// [`ConfigError`](MemoryError::ConfigError): such a cache could
    /// never hold anything and every insert would evict itself.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MemoryError::config_error("cache capacity must be positive"));
        }
        let preallocate = capacity.min(1024);
        Ok(Self {
            capacity,
            map: HashMap::with_capacity(preallocate),
            nodes: Vec::with_capacity(preallocate),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    /// Looks a key up and marks it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&idx) = self.map.get(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        self.promote(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Looks a key up without disturbing recency or counters
    pub fn peek(&self, key: &K) -> Option<&V> {
        let &idx = self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Whether the key is cached, without disturbing recency or counters
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or overwrites an entry and marks it most recently used
    ///
    /// Returns the value this insert displaced: the previous value under
    /// the same key, or the evicted least recently used value when a new
    /// key arrives at capacity. Overwrites do not count as evictions.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.map.get(&key) {
            self.promote(idx);
            return self.nodes[idx].as_mut().map(|node| mem::replace(&mut node.value, value));
        }

        let displaced = if self.map.len() >= self.capacity { self.evict_lru() } else { None };

        let node = Node { key: key.clone(), value, prev: NIL, next: NIL };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.push_front(idx);

        displaced
    }

    /// Removes an entry, returning its value
    ///
    /// Explicit removal does not count as an eviction.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        let node = self.nodes[idx].take()?;
        self.free.push(idx);
        Some(node.value)
    }

    /// Removes and returns the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.detach(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        self.free.push(idx);
        Some((node.key, node.value))
    }

    /// Drops every entry; counters are kept
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Number of entries currently cached
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hit rate as a percentage, 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }

    /// Snapshot of the cache's counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            entries: self.map.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Resets hit, miss and eviction counters; entries are kept
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Evicts the least recently used entry under capacity pressure
    fn evict_lru(&mut self) -> Option<V> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.detach(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        self.free.push(idx);
        self.evictions += 1;
        Some(node.value)
    }

    /// Moves an entry to the most recently used position
    fn promote(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    /// Unlinks an entry from the recency list
    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.nodes[idx] {
            Some(ref node) => (node.prev, node.next),
            None => return,
        };
        match self.nodes.get_mut(prev).and_then(Option::as_mut) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match self.nodes.get_mut(next).and_then(Option::as_mut) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = NIL;
            node.next = NIL;
        }
    }

    /// Links an entry in at the most recently used position
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = NIL;
            node.next = old_head;
        }
        match self.nodes.get_mut(old_head).and_then(Option::as_mut) {
            Some(node) => node.prev = idx,
            None => self.tail = idx,
        }
        self.head = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(LruCache::<u32, u32>::new(0).is_err());
    }

    #[test]
    fn get_promotes_and_put_evicts_lru() {
        let mut cache = LruCache::new(3).unwrap();
        cache.put(1, "one");
        cache.put(2, "two");
        cache.put(3, "three");

        // Touching 1 makes 2 the least recently used entry.
        assert_eq!(cache.get(&1), Some(&"one"));
        assert_eq!(cache.put(4, "four"), Some("two"));

        assert!(!cache.contains_key(&2));
        assert!(cache.contains_key(&1));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overwrite_returns_old_value_without_eviction() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put("k", 1);
        assert_eq!(cache.put("k", 2), Some(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.peek(&"k"), Some(&2));
    }

    #[test]
    fn peek_and_contains_do_not_disturb_order() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.peek(&"a"), Some(&1));
        assert!(cache.contains_key(&"a"));

        // "a" is still least recently used.
        cache.put("c", 3);
        assert!(!cache.contains_key(&"a"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn counters_track_hits_and_misses() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put(1, 10);

        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&1).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((cache.hit_rate() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn hit_rate_is_zero_before_first_lookup() {
        let cache = LruCache::<u8, u8>::new(4).unwrap();
        assert_eq!(cache.hit_rate(), 0.0);
    }

    #[test]
    fn remove_detaches_entry() {
        let mut cache = LruCache::new(3).unwrap();
        cache.put(1, "one");
        cache.put(2, "two");

        assert_eq!(cache.remove(&1), Some("one"));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);

        // The freed slot is reused and order stays intact.
        cache.put(3, "three");
        cache.put(4, "four");
        cache.put(5, "five");
        assert!(!cache.contains_key(&2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn pop_lru_drains_in_recency_order() {
        let mut cache = LruCache::new(3).unwrap();
        cache.put(1, "one");
        cache.put(2, "two");
        cache.put(3, "three");
        cache.get(&1);

        assert_eq!(cache.pop_lru(), Some((2, "two")));
        assert_eq!(cache.pop_lru(), Some((3, "three")));
        assert_eq!(cache.pop_lru(), Some((1, "one")));
        assert_eq!(cache.pop_lru(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_keeps_counters() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put(1, 1);
        cache.get(&1);
        cache.get(&2);

        cache.clear();
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        cache.reset_stats();
        assert_eq!(cache.stats().total_requests(), 0);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut cache = LruCache::new(4).unwrap();
        for i in 0..100 {
            cache.put(i, i * 2);
            assert!(cache.len() <= 4);
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().evictions, 96);
        for i in 96..100 {
            assert_eq!(cache.peek(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn single_entry_cache() {
        let mut cache = LruCache::new(1).unwrap();
        assert_eq!(cache.put("a", 1), None);
        assert_eq!(cache.put("b", 2), Some(1));
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"a"), None);
    }
}
