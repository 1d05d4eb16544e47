//! Least-recently-used caching
//!
//! [`LruCache`] is a generic O(1) LRU cache over owned values;
//! [`DisposingLruCache`] layers a release callback on top for values
//! that need teardown when they leave the cache. Both track hit, miss
//! and eviction counters exposed through [`CacheStats`].

pub mod disposing;
pub mod lru;
pub mod stats;

pub use disposing::DisposingLruCache;
pub use lru::LruCache;
pub use stats::CacheStats;
