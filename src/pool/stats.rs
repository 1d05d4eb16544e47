//! Pool statistics snapshot

/// Point-in-time view of a pool's configuration and counters
///
/// Produced by [`BlockPool::stats`](super::BlockPool::stats) and
/// [`ConcurrentAllocator::stats`](super::ConcurrentAllocator::stats).
/// Counters are monotonic over the pool's lifetime; `current_usage` and
/// `free_blocks` always sum to `block_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Size of each block in bytes, after alignment rounding
    pub block_size: usize,
    /// Total number of blocks in the pool
    pub block_count: usize,
    /// Blocks currently allocated
    pub current_usage: usize,
    /// Blocks currently available
    pub free_blocks: usize,
    /// Total successful allocations since creation
    pub allocations: u64,
    /// Total successful deallocations since creation
    pub deallocations: u64,
}

impl PoolStats {
    /// Fraction of the pool currently in use, 0.0 to 100.0 percent
    pub fn utilization(&self) -> f64 {
        if self.block_count == 0 {
            return 0.0;
        }
        self.current_usage as f64 / self.block_count as f64 * 100.0
    }

    /// Total bytes reserved for block storage
    pub fn reserved_bytes(&self) -> usize {
        self.block_size * self.block_count
    }
}
