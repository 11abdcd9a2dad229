//! Integration tests for parallel pool use

use std::collections::HashSet;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use std::thread;

use fixed_pool::{FixedPool, MutexLock, SpinLock, ThreadSafePolicy};

const THREADS: usize = 4;
const ROUNDS: usize = 200;
const ITEMS_PER_ROUND: usize = 16;

/// Allocate/write/verify/free cycles on every thread, with a global
/// registry asserting no address is live in two threads at once.
fn hammer<L>(pool: FixedPool<L>)
where
    L: ThreadSafePolicy + Send + Sync + 'static,
{
    let pool = Arc::new(pool);
    let live_anywhere = Arc::new(Mutex::new(HashSet::<usize>::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let pool = Arc::clone(&pool);
            let live_anywhere = Arc::clone(&live_anywhere);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let mut items = Vec::with_capacity(ITEMS_PER_ROUND);
                    for _ in 0..ITEMS_PER_ROUND {
                        let item = pool.allocate().expect("allocation failed");
                        let addr = item.as_ptr() as usize;
                        assert!(
                            live_anywhere.lock().unwrap().insert(addr),
                            "address {addr:#x} issued while already live"
                        );
                        unsafe {
                            std::ptr::write_bytes(item.as_ptr(), thread_id as u8, pool.item_size())
                        };
                        items.push(addr);
                    }

                    // Nobody else may have scribbled on our live slots.
                    for &addr in &items {
                        unsafe { assert_eq!(*(addr as *const u8), thread_id as u8) };
                    }

                    for addr in items {
                        assert!(live_anywhere.lock().unwrap().remove(&addr));
                        // SAFETY: addr came from this pool, is live, and was
                        // unregistered above so no other thread can free it.
                        unsafe { pool.deallocate(NonNull::new_unchecked(addr as *mut u8)) };
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(pool.live_items().is_empty());
    let stats = pool.stats();
    assert_eq!(stats.total_allocs, (THREADS * ROUNDS * ITEMS_PER_ROUND) as u64);
    assert_eq!(stats.total_allocs, stats.total_deallocs);
}

#[test]
fn test_parallel_churn_under_mutex() {
    hammer(FixedPool::<MutexLock>::new(64, 32).expect("failed to create pool"));
}

#[test]
fn test_parallel_churn_under_spin() {
    hammer(FixedPool::<SpinLock>::new(64, 32).expect("failed to create pool"));
}

#[test]
fn test_enumeration_races_with_churn() {
    let pool = Arc::new(FixedPool::<MutexLock>::new(64, 32).expect("failed to create pool"));

    let churner = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for _ in 0..2_000 {
                let item = pool.allocate().expect("allocation failed");
                unsafe { pool.deallocate(item) };
            }
        })
    };

    // Snapshots taken mid-churn stay internally consistent.
    for _ in 0..100 {
        let live = pool.live_items();
        let stats = pool.stats();
        assert!(live.len() <= stats.capacity_items);
    }

    churner.join().unwrap();
    assert!(pool.live_items().is_empty());
}
