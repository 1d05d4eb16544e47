//! Fixed-size block pool allocator
//!
//! [`BlockPool`] owns one contiguous arena carved into equally sized,
//! equally aligned blocks. Free blocks are tracked in a singly linked
//! free list threaded through a side table of slot records, so block
//! storage itself is never written by the pool. Allocation and
//! deallocation are O(1).
//!
//! Every allocation returns a [`BlockHandle`] carrying the slot index and
//! the slot's generation at the time of allocation. The generation is
//! bumped on release, so a handle kept past its release (double free,
//! use after release into a reused slot) no longer matches and is
//! rejected instead of corrupting the free list.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::utils::align_up;

use super::stats::PoolStats;

/// Sentinel terminating the free list chain
const NIL: u32 = u32::MAX;

/// Opaque ticket for one allocated block
///
/// Handles are cheap to copy and carry no lifetime; validity is checked
/// on every use. A handle is only honored by the pool that issued it,
/// and only until the block it names is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    index: u32,
    generation: u32,
}

impl BlockHandle {
    /// Slot index of the block inside its pool
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Bookkeeping record for one block, kept outside block storage
#[derive(Debug)]
struct Slot {
    /// Next slot in the free list, `NIL` when allocated or last
    next_free: u32,
    /// Bumped on every release; handles from older generations are stale
    generation: u32,
    /// Whether the block is currently allocated
    allocated: bool,
}

/// Pool allocator serving fixed-size blocks from one contiguous arena
///
/// All operations take `&mut self`; wrap the pool in
/// [`ConcurrentAllocator`](super::ConcurrentAllocator) for shared use
/// across threads.
///
/// # Example
///
/// ```
/// use poolkit::BlockPool;
///
/// let mut pool = BlockPool::new(64, 8)?;
/// let handle = pool.allocate()?;
/// assert_eq!(pool.stats().current_usage, 1);
/// pool.deallocate(handle)?;
/// assert_eq!(pool.stats().current_usage, 0);
/// # Ok::<(), poolkit::MemoryError>(())
/// ```
#[derive(Debug)]
pub struct BlockPool {
    /// Start of the block storage arena
    arena: NonNull<u8>,
    /// Layout the arena was allocated with, needed for deallocation
    arena_layout: Layout,
    /// Size of each block in bytes, after alignment rounding
    block_size: usize,
    /// Alignment of each block
    block_align: usize,
    /// Total number of blocks
    block_count: usize,
    /// Per-block bookkeeping, parallel to the arena
    slots: Box<[Slot]>,
    /// Head of the free list, `NIL` when exhausted
    free_head: u32,
    /// Total successful allocations
    allocations: u64,
    /// Total successful deallocations
    deallocations: u64,
    /// Blocks currently allocated
    current_usage: usize,
}

// SAFETY: the arena is exclusively owned by the pool; the raw pointer is
// never shared outside &self/&mut self borrows, so moving the pool to
// another thread is sound.
unsafe impl Send for BlockPool {}

impl BlockPool {
    /// Creates a pool of `block_count` blocks of at least `block_size` bytes
    ///
    /// Blocks are aligned to the machine word. The effective block size is
    /// rounded up to at least one word and to a multiple of the alignment;
    /// [`stats`](Self::stats) reports the effective value.
    pub fn new(block_size: usize, block_count: usize) -> Result<Self> {
        Self::with_size_align(block_size, align_of::<usize>(), block_count)
    }

    /// Creates a pool whose blocks fit the given layout
    pub fn with_layout(block_layout: Layout, block_count: usize) -> Result<Self> {
        Self::with_size_align(block_layout.size(), block_layout.align(), block_count)
    }

    /// Creates a pool sized and aligned for values of type `T`
    pub fn for_type<T>(block_count: usize) -> Result<Self> {
        Self::with_layout(Layout::new::<T>(), block_count)
    }

    fn with_size_align(block_size: usize, block_align: usize, block_count: usize) -> Result<Self> {
        if block_count == 0 {
            return Err(MemoryError::config_error("block count must be positive"));
        }
        if block_count >= NIL as usize {
            return Err(MemoryError::invalid_size(
                block_count,
                "block count exceeds the handle index range",
            ));
        }
        let block_align = block_align.max(align_of::<usize>());
        let block_size = align_up(block_size.max(size_of::<usize>()), block_align);

        let total = block_size
            .checked_mul(block_count)
            .ok_or_else(|| MemoryError::invalid_size(block_size, "arena size overflows usize"))?;
        let arena_layout = Layout::from_size_align(total, block_align)
            .map_err(|_| MemoryError::invalid_size(total, "invalid arena layout"))?;

        // SAFETY: total > 0 because block_count > 0 and block_size >= one word
        let raw = unsafe { alloc::alloc(arena_layout) };
        let arena = NonNull::new(raw).ok_or_else(|| MemoryError::out_of_memory(total))?;

        // Chain slots in ascending order so the lowest index is served first.
        let slots: Box<[Slot]> = (0..block_count)
            .map(|i| Slot {
                next_free: if i + 1 < block_count { (i + 1) as u32 } else { NIL },
                generation: 0,
                allocated: false,
            })
            .collect();

        debug!(block_size, block_count, "block pool created");

        Ok(Self {
            arena,
            arena_layout,
            block_size,
            block_align,
            block_count,
            slots,
            free_head: 0,
            allocations: 0,
            deallocations: 0,
            current_usage: 0,
        })
    }

    /// Allocates one block, O(1)
    ///
    /// Returns [`MemoryError::PoolExhausted`] when no free block is left;
    /// the pool remains usable and the call can be retried after a release.
    pub fn allocate(&mut self) -> Result<BlockHandle> {
        let index = self.free_head;
        if index == NIL {
            return Err(MemoryError::pool_exhausted(self.block_count));
        }

        let slot = &mut self.slots[index as usize];
        self.free_head = slot.next_free;
        slot.next_free = NIL;
        slot.allocated = true;

        self.allocations += 1;
        self.current_usage += 1;

        Ok(BlockHandle { index, generation: slot.generation })
    }

    /// Releases one block back to the pool, O(1)
    ///
    /// Invalid handles are rejected without touching pool state:
    /// [`MemoryError::ForeignHandle`] when the index is outside this pool,
    /// [`MemoryError::StaleHandle`] when the block was already released
    /// (double free) or the handle outlived a release/reallocate cycle.
    pub fn deallocate(&mut self, handle: BlockHandle) -> Result<()> {
        let index = handle.index as usize;
        if index >= self.block_count {
            warn!(
                index,
                capacity = self.block_count,
                "rejected release: handle does not belong to this pool"
            );
            return Err(MemoryError::foreign_handle(index, self.block_count));
        }

        let slot = &mut self.slots[index];
        if !slot.allocated || slot.generation != handle.generation {
            warn!(index, "rejected release: block was already released");
            return Err(MemoryError::stale_handle(index));
        }

        slot.allocated = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_head;
        self.free_head = handle.index;

        self.deallocations += 1;
        self.current_usage -= 1;

        Ok(())
    }

    /// Returns the block's bytes if the handle is currently valid
    pub fn block(&self, handle: BlockHandle) -> Option<&[u8]> {
        let ptr = self.block_ptr(handle)?;
        // SAFETY: the block is allocated and stays in place for the
        // lifetime of &self; exclusivity is enforced by the borrow rules.
        Some(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.block_size) })
    }

    /// Returns the block's bytes mutably if the handle is currently valid
    pub fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [u8]> {
        let ptr = self.block_ptr(handle)?;
        // SAFETY: as for `block`, plus &mut self guarantees no other
        // reference into the arena exists.
        Some(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.block_size) })
    }

    /// Raw pointer to the block if the handle is currently valid
    ///
    /// The pointer is valid for `block_size` bytes until the block is
    /// released or the pool is dropped.
    pub fn block_ptr(&self, handle: BlockHandle) -> Option<NonNull<u8>> {
        if !self.contains(handle) {
            return None;
        }
        Some(self.base_ptr(handle.index as usize))
    }

    /// Whether the handle names a block currently allocated from this pool
    pub fn contains(&self, handle: BlockHandle) -> bool {
        let index = handle.index as usize;
        index < self.block_count
            && self.slots[index].allocated
            && self.slots[index].generation == handle.generation
    }

    /// Like [`block_ptr`](Self::block_ptr) but reports why a handle is invalid
    pub(crate) fn checked_ptr(&self, handle: BlockHandle) -> Result<NonNull<u8>> {
        let index = handle.index as usize;
        if index >= self.block_count {
            return Err(MemoryError::foreign_handle(index, self.block_count));
        }
        let slot = &self.slots[index];
        if !slot.allocated || slot.generation != handle.generation {
            return Err(MemoryError::stale_handle(index));
        }
        Ok(self.base_ptr(index))
    }

    /// Pointers to every currently allocated block, ascending by index
    pub(crate) fn allocated_block_ptrs(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.allocated)
            .map(|(index, _)| self.base_ptr(index))
    }

    fn base_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.block_count);
        // SAFETY: index < block_count, so the offset stays inside the
        // arena allocation and cannot wrap to null.
        unsafe { NonNull::new_unchecked(self.arena.as_ptr().add(index * self.block_size)) }
    }

    /// Effective size of each block in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Alignment of each block
    pub fn block_align(&self) -> usize {
        self.block_align
    }

    /// Total number of blocks in the pool
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of blocks currently allocated
    pub fn used_blocks(&self) -> usize {
        self.current_usage
    }

    /// Number of blocks currently available
    pub fn free_blocks(&self) -> usize {
        self.block_count - self.current_usage
    }

    /// Total bytes reserved for block storage
    pub fn capacity(&self) -> usize {
        self.block_size * self.block_count
    }

    /// Whether every block is currently allocated
    pub fn is_full(&self) -> bool {
        self.free_head == NIL
    }

    /// Whether no block is currently allocated
    pub fn is_empty(&self) -> bool {
        self.current_usage == 0
    }

    /// Snapshot of the pool's configuration and counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            block_size: self.block_size,
            block_count: self.block_count,
            current_usage: self.current_usage,
            free_blocks: self.free_blocks(),
            allocations: self.allocations,
            deallocations: self.deallocations,
        }
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        debug!(
            block_count = self.block_count,
            leaked = self.current_usage,
            "block pool destroyed"
        );
        // SAFETY: the arena was allocated with exactly this layout and is
        // freed exactly once, here.
        unsafe { alloc::dealloc(self.arena.as_ptr(), self.arena_layout) };
    }
}
