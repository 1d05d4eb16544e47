//! Fixed-size block pool allocation
//!
//! A pool allocator partitions one contiguous arena into equally sized
//! blocks and serves them in O(1) through an index-based free list.
//!
//! ## Modules
//! - `allocator` - Main `BlockPool` implementation and `BlockHandle`
//! - `thread_safe` - `ConcurrentAllocator<T>`, a typed mutex-guarded facade
//! - `stats` - Statistics snapshot types

pub mod allocator;
pub mod stats;
pub mod thread_safe;

pub use allocator::{BlockHandle, BlockPool};
pub use stats::PoolStats;
pub use thread_safe::{ConcurrentAllocator, SlotHandle};
