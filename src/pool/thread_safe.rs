//! Thread-safe typed pool allocator
//!
//! [`ConcurrentAllocator`] owns a [`BlockPool`] behind a
//! [`parking_lot::Mutex`] and stores values of one type `T` in its
//! blocks. Acquire writes a value into a fresh block, release moves it
//! back out; values still resident when the allocator is dropped are
//! dropped with it.

use std::marker::PhantomData;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::Result;

use super::allocator::{BlockHandle, BlockPool};
use super::stats::PoolStats;

/// Ticket for one value stored in a [`ConcurrentAllocator`]
///
/// Deliberately neither `Clone` nor `Copy`: the handle is consumed by
/// [`ConcurrentAllocator::release`], so the type system rules out a
/// double release through the typed interface.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle<T> {
    raw: BlockHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotHandle<T> {
    /// Slot index of the value inside its allocator
    pub fn index(&self) -> usize {
        self.raw.index()
    }
}

/// Mutex-guarded pool of values of type `T`
///
/// All methods take `&self` and serialize on an internal lock, so the
/// allocator can be shared across threads behind an `Arc`. Handles can
/// be acquired on one thread and released on another.
///
/// # Example
///
/// ```
/// use poolkit::ConcurrentAllocator;
///
/// let pool = ConcurrentAllocator::<String>::new(8)?;
/// let handle = pool.acquire("hello".to_owned())?;
/// pool.with_mut(&handle, |s| s.push_str(" world"))?;
/// assert_eq!(pool.release(handle)?, "hello world");
/// # Ok::<(), poolkit::MemoryError>(())
/// ```
pub struct ConcurrentAllocator<T> {
    pool: Mutex<BlockPool>,
    _marker: PhantomData<T>,
}

// SAFETY: values of T only move across threads as whole values (acquire,
// release, drop) or are accessed under the lock, so T: Send suffices for
// both sharing and sending the allocator.
unsafe impl<T: Send> Send for ConcurrentAllocator<T> {}
unsafe impl<T: Send> Sync for ConcurrentAllocator<T> {}

impl<T> ConcurrentAllocator<T> {
    /// Creates an allocator with room for `capacity` values of `T`
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self { pool: Mutex::new(BlockPool::for_type::<T>(capacity)?), _marker: PhantomData })
    }

    /// Stores a value in a fresh slot
    ///
    /// Returns [`PoolExhausted`](crate::MemoryError::PoolExhausted) when
    /// the pool is full; the value is dropped in that case.
    pub fn acquire(&self, value: T) -> Result<SlotHandle<T>> {
        let mut pool = self.pool.lock();
        let raw = pool.allocate()?;
        let ptr = pool.checked_ptr(raw)?;
        // SAFETY: a freshly allocated block is aligned for T, at least
        // size_of::<T>() bytes, and referenced by no one else.
        unsafe { ptr.cast::<T>().as_ptr().write(value) };
        Ok(SlotHandle { raw, _marker: PhantomData })
    }

    /// Moves the value out of its slot and releases the slot
    ///
    /// The handle is consumed either way. An invalid handle (released
    /// through the raw index on another path, or kept across allocator
    /// misuse) is rejected without touching pool state.
    pub fn release(&self, handle: SlotHandle<T>) -> Result<T> {
        let mut pool = self.pool.lock();
        let ptr = match pool.checked_ptr(handle.raw) {
            Ok(ptr) => ptr,
            Err(err) => {
                warn!(index = handle.raw.index(), %err, "rejected release of invalid handle");
                return Err(err);
            }
        };
        // SAFETY: the slot is live and holds the T written by acquire;
        // the lock is held, so nothing else can observe the slot while
        // the value is moved out and the block released below.
        let value = unsafe { ptr.cast::<T>().as_ptr().read() };
        pool.deallocate(handle.raw)?;
        Ok(value)
    }

    /// Runs `f` with a shared reference to the stored value
    pub fn with<R>(&self, handle: &SlotHandle<T>, f: impl FnOnce(&T) -> R) -> Result<R> {
        let pool = self.pool.lock();
        let ptr = pool.checked_ptr(handle.raw)?;
        // SAFETY: the slot is live and initialized; the lock serializes
        // every access to it for the duration of the borrow.
        let value = unsafe { ptr.cast::<T>().as_ref() };
        Ok(f(value))
    }

    /// Runs `f` with an exclusive reference to the stored value
    pub fn with_mut<R>(&self, handle: &SlotHandle<T>, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let pool = self.pool.lock();
        let ptr = pool.checked_ptr(handle.raw)?;
        // SAFETY: as for `with`; holding the lock for the duration of the
        // call makes this reference exclusive.
        let value = unsafe { &mut *ptr.cast::<T>().as_ptr() };
        Ok(f(value))
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.pool.lock().block_count()
    }

    /// Number of values currently stored
    pub fn in_use(&self) -> usize {
        self.pool.lock().used_blocks()
    }

    /// Snapshot of the underlying pool's counters
    pub fn stats(&self) -> PoolStats {
        self.pool.lock().stats()
    }
}

impl<T> Drop for ConcurrentAllocator<T> {
    fn drop(&mut self) {
        let pool = self.pool.get_mut();
        for ptr in pool.allocated_block_ptrs() {
            // SAFETY: every allocated slot holds an initialized T written
            // by acquire, and no handle can reach it past this point.
            unsafe { ptr.cast::<T>().as_ptr().drop_in_place() };
        }
    }
}

impl<T> std::fmt::Debug for ConcurrentAllocator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.pool.lock().stats();
        f.debug_struct("ConcurrentAllocator")
            .field("capacity", &stats.block_count)
            .field("in_use", &stats.current_usage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn round_trips_values() {
        let pool = ConcurrentAllocator::<u64>::new(4).unwrap();
        let handle = pool.acquire(7).unwrap();
        assert_eq!(pool.with(&handle, |v| *v).unwrap(), 7);
        pool.with_mut(&handle, |v| *v += 1).unwrap();
        assert_eq!(pool.release(handle).unwrap(), 8);
    }

    #[test]
    fn exhaustion_drops_the_value() {
        let pool = ConcurrentAllocator::<String>::new(1).unwrap();
        let _held = pool.acquire("resident".to_owned()).unwrap();

        let err = pool.acquire("overflow".to_owned()).unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn drop_runs_destructors_of_resident_values() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let pool = ConcurrentAllocator::<Tracked>::new(4).unwrap();
            let _a = pool.acquire(Tracked(Arc::clone(&drops))).unwrap();
            let _b = pool.acquire(Tracked(Arc::clone(&drops))).unwrap();

            // Released values are dropped by the caller, resident ones by
            // the allocator.
            let c = pool.acquire(Tracked(Arc::clone(&drops))).unwrap();
            drop(pool.release(c).unwrap());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn shared_across_threads() {
        let pool = Arc::new(ConcurrentAllocator::<usize>::new(64).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let value = t * 1000 + i;
                        let handle = pool.acquire(value).unwrap();
                        assert_eq!(pool.release(handle).unwrap(), value);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.allocations, 400);
        assert_eq!(stats.deallocations, 400);
        assert_eq!(stats.current_usage, 0);
    }

    #[test]
    fn release_on_another_thread() {
        let pool = Arc::new(ConcurrentAllocator::<String>::new(8).unwrap());
        let handle = pool.acquire("crosses threads".to_owned()).unwrap();

        let worker = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.release(handle).unwrap())
        };
        assert_eq!(worker.join().unwrap(), "crosses threads");
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(ConcurrentAllocator::<u32>::new(0).is_err());
    }
}
