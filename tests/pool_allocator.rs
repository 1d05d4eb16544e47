//! Integration tests for the block pool allocator

use poolkit::{BlockPool, MemoryError};
use proptest::prelude::*;

#[test]
fn full_drain_and_refill() {
    let mut pool = BlockPool::new(64, 8).unwrap();

    let handles: Vec<_> = (0..8).map(|_| pool.allocate().unwrap()).collect();
    assert!(pool.is_full());
    assert!(pool.allocate().unwrap_err().is_exhausted());

    for handle in handles {
        pool.deallocate(handle).unwrap();
    }
    assert_eq!(pool.free_blocks(), 8);

    // The pool is fully usable again after a drain.
    let again: Vec<_> = (0..8).map(|_| pool.allocate().unwrap()).collect();
    assert_eq!(again.len(), 8);
}

#[test]
fn outstanding_handles_have_distinct_blocks() {
    let mut pool = BlockPool::new(32, 16).unwrap();
    let handles: Vec<_> = (0..16).map(|_| pool.allocate().unwrap()).collect();

    let mut seen = vec![false; 16];
    for handle in &handles {
        assert!(!seen[handle.index()], "block {} issued twice", handle.index());
        seen[handle.index()] = true;
    }
}

#[test]
fn invalid_releases_leave_counters_untouched() {
    let mut pool = BlockPool::new(32, 4).unwrap();
    let a = pool.allocate().unwrap();
    let b = pool.allocate().unwrap();
    pool.deallocate(a).unwrap();

    let before = pool.stats();

    // Double free.
    assert!(matches!(pool.deallocate(a), Err(MemoryError::StaleHandle { .. })));
    // Stale handle after the slot was reissued.
    let c = pool.allocate().unwrap();
    assert_eq!(c.index(), a.index());
    assert!(pool.deallocate(a).is_err());

    let after = pool.stats();
    assert_eq!(before.deallocations, after.deallocations);
    assert_eq!(after.current_usage, 2);

    pool.deallocate(b).unwrap();
    pool.deallocate(c).unwrap();
}

#[test]
fn block_contents_survive_unrelated_churn() {
    let mut pool = BlockPool::new(16, 8).unwrap();
    let keeper = pool.allocate().unwrap();
    pool.block_mut(keeper).unwrap().fill(0x5A);

    // Churn the rest of the pool.
    for _ in 0..50 {
        let h = pool.allocate().unwrap();
        pool.block_mut(h).unwrap().fill(0xFF);
        pool.deallocate(h).unwrap();
    }

    assert!(pool.block(keeper).unwrap().iter().all(|&b| b == 0x5A));
}

proptest! {
    /// Conservation: under any interleaving of allocations and releases,
    /// used + free == capacity, allocation fails exactly at capacity, and
    /// no block is handed out twice while outstanding.
    #[test]
    fn conservation_under_random_interleaving(ops in prop::collection::vec(any::<(bool, u8)>(), 1..300)) {
        const CAPACITY: usize = 16;
        let mut pool = BlockPool::new(24, CAPACITY).unwrap();
        let mut live = Vec::new();

        for (allocate, pick) in ops {
            if allocate {
                match pool.allocate() {
                    Ok(handle) => {
                        prop_assert!(live.len() < CAPACITY);
                        prop_assert!(!live.contains(&handle));
                        live.push(handle);
                    }
                    Err(err) => {
                        prop_assert!(err.is_exhausted());
                        prop_assert_eq!(live.len(), CAPACITY);
                    }
                }
            } else if !live.is_empty() {
                let handle = live.swap_remove(pick as usize % live.len());
                pool.deallocate(handle).unwrap();
            }

            let stats = pool.stats();
            prop_assert_eq!(stats.current_usage, live.len());
            prop_assert_eq!(stats.current_usage + stats.free_blocks, CAPACITY);
        }
    }
}
