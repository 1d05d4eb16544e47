//! Fixed-size block pool allocation and LRU caching primitives
//!
//! This crate provides two small, independent memory-management building
//! blocks:
//!
//! - Block pools: [`BlockPool`] manages one contiguous arena partitioned
//!   into equally sized blocks with an O(1) index-based free list, and
//!   [`ConcurrentAllocator`] wraps it in a mutex for typed, multi-threaded
//!   use.
//! - Caching: [`LruCache`] is a generic O(1) least-recently-used cache,
//!   and [`DisposingLruCache`] adds a release callback for values that
//!   leave the cache.
//!
//! # Example
//!
//! ```
//! use poolkit::{ConcurrentAllocator, LruCache};
//!
//! fn main() -> poolkit::Result<()> {
//!     // Typed pool with room for 64 values.
//!     let pool = ConcurrentAllocator::<u64>::new(64)?;
//!     let handle = pool.acquire(42)?;
//!     assert_eq!(pool.with(&handle, |v| *v)?, 42);
//!     assert_eq!(pool.release(handle)?, 42);
//!
//!     // LRU cache with capacity 2.
//!     let mut cache = LruCache::new(2)?;
//!     cache.put("a", 1);
//!     cache.put("b", 2);
//!     cache.put("c", 3); // evicts "a"
//!     assert_eq!(cache.get(&"a"), None);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod pool;
pub mod utils;

// Re-export common types for convenience
pub use cache::{CacheStats, DisposingLruCache, LruCache};
pub use error::{MemoryError, Result};
pub use pool::{BlockHandle, BlockPool, ConcurrentAllocator, PoolStats, SlotHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
