//! Integration tests for the fixed pool manager

use std::collections::HashSet;
use std::mem;
use std::ptr::NonNull;

use fixed_pool::{FixedPool, NoLock, PoolError};

#[test]
fn test_rejects_item_size_below_pointer() {
    let required = mem::size_of::<*mut u8>();
    let result = FixedPool::<NoLock>::new(required - 1, 16);
    assert_eq!(
        result.err(),
        Some(PoolError::InvalidItemSize { item_size: required - 1, required })
    );

    let result = FixedPool::<NoLock>::new(0, 16);
    assert!(matches!(result, Err(PoolError::InvalidItemSize { .. })));
}

#[test]
fn test_rejects_zero_items_per_block() {
    let result = FixedPool::<NoLock>::new(64, 0);
    assert_eq!(result.err(), Some(PoolError::InvalidBlockCapacity));
}

#[test]
fn test_rejects_size_overflow() {
    let result = FixedPool::<NoLock>::new(usize::MAX, 2);
    assert!(matches!(result, Err(PoolError::SizeOverflow { .. })));
}

#[test]
fn test_basic_allocate_write_free() {
    let pool = FixedPool::<NoLock>::new(128, 16).expect("failed to create pool");

    let item = pool.allocate().expect("allocation failed");
    unsafe {
        std::ptr::write_bytes(item.as_ptr(), 0x42, 128);
        assert_eq!(*item.as_ptr(), 0x42);
        pool.deallocate(item);
    }
}

#[test]
fn test_freelist_is_lifo() {
    let pool = FixedPool::<NoLock>::new(16, 64).expect("failed to create pool");

    let x = pool.allocate().expect("allocation failed");
    let y = pool.allocate().expect("allocation failed");

    unsafe {
        pool.deallocate(y);
        pool.deallocate(x);
    }

    // Most recently freed comes back first.
    assert_eq!(pool.allocate().expect("allocation failed"), x);
    assert_eq!(pool.allocate().expect("allocation failed"), y);
}

#[test]
fn test_addresses_are_slot_aligned_and_distinct() {
    let item_size = 50;
    let items_per_block = 25;
    let pool = FixedPool::<NoLock>::new(item_size, items_per_block).expect("failed to create pool");

    let mut seen = HashSet::new();
    for _ in 0..100 {
        let item = pool.allocate().expect("allocation failed");
        assert!(seen.insert(item), "address {item:p} issued twice");
        // Every address sits at a slot boundary of some block.
        assert!(pool.contains(item.as_ptr()));
    }

    // Slot spacing within one block is exactly item_size.
    let sorted = {
        let mut addrs: Vec<usize> = seen.iter().map(|p| p.as_ptr() as usize).collect();
        addrs.sort_unstable();
        addrs
    };
    for pair in sorted.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= item_size, "slots overlap: gap {gap}");
    }
}

#[test]
fn test_grows_across_blocks() {
    let pool = FixedPool::<NoLock>::new(64, 10).expect("failed to create pool");

    let mut items = Vec::new();
    for _ in 0..35 {
        items.push(pool.allocate().expect("allocation failed"));
    }

    let stats = pool.stats();
    assert_eq!(stats.blocks, 4);
    assert_eq!(stats.handed_out_items, 35);
    assert_eq!(stats.live_items, 35);

    for item in items {
        unsafe { pool.deallocate(item) };
    }
    assert_eq!(pool.stats().live_items, 0);
}

#[test]
fn test_run_returns_contiguous_live_slots() {
    let item_size = 64;
    let pool = FixedPool::<NoLock>::new(item_size, 16).expect("failed to create pool");

    let first = pool.allocate_run(8).expect("run allocation failed");
    let live = pool.live_items();

    let mut run = Vec::new();
    for offset in 0..8 {
        let slot = unsafe { NonNull::new_unchecked(first.as_ptr().add(offset * item_size)) };
        assert!(live.contains(&slot), "run slot {offset} is not live");
        run.push(slot);
    }
    let distinct: HashSet<_> = run.iter().copied().collect();
    assert_eq!(distinct.len(), 8);
}

#[test]
fn test_run_rejects_bad_lengths() {
    let pool = FixedPool::<NoLock>::new(64, 16).expect("failed to create pool");

    assert!(matches!(pool.allocate_run(0), Err(PoolError::InvalidRunLength { .. })));
    assert!(matches!(pool.allocate_run(17), Err(PoolError::InvalidRunLength { .. })));
    assert!(pool.allocate_run(16).is_ok());
}

#[test]
fn test_run_ignores_freelist() {
    let pool = FixedPool::<NoLock>::new(64, 16).expect("failed to create pool");

    let item = pool.allocate().expect("allocation failed");
    unsafe { pool.deallocate(item) };

    // Freed slots are not contiguous, so runs come from a block tail even
    // when the freelist could serve the request by count.
    let run = pool.allocate_run(1).expect("run allocation failed");
    assert_ne!(run, item);

    // A following single allocation still pops the freelist.
    assert_eq!(pool.allocate().expect("allocation failed"), item);
}

#[test]
fn test_run_scans_older_blocks_first() {
    let items_per_block = 10;
    let pool = FixedPool::<NoLock>::new(64, items_per_block).expect("failed to create pool");

    // Leave 4 tail slots in block 0, then force block 1 into existence.
    for _ in 0..6 {
        pool.allocate().expect("allocation failed");
    }
    pool.allocate_run(8).expect("run allocation failed");
    assert_eq!(pool.stats().blocks, 2);

    // A run of 3 fits the remaining tail of block 0; no third block.
    pool.allocate_run(3).expect("run allocation failed");
    assert_eq!(pool.stats().blocks, 2);

    // A run of 4 fits neither tail (1 and 2 left); the pool grows.
    pool.allocate_run(4).expect("run allocation failed");
    assert_eq!(pool.stats().blocks, 3);
}

#[test]
fn test_contains_rejects_foreign_pointers() {
    let pool = FixedPool::<NoLock>::new(64, 16).expect("failed to create pool");
    let item = pool.allocate().expect("allocation failed");

    assert!(pool.contains(item.as_ptr()));

    let local = 0u8;
    assert!(!pool.contains(&local as *const u8));
    assert!(!pool.contains(std::ptr::null()));
}

#[test]
fn test_for_type_raises_small_items_to_pointer_size() {
    let pool = FixedPool::<NoLock>::for_type::<u8>(16).expect("failed to create pool");
    assert_eq!(pool.item_size(), mem::size_of::<*mut u8>());

    let pool = FixedPool::<NoLock>::for_type::<[u64; 4]>(16).expect("failed to create pool");
    assert_eq!(pool.item_size(), 32);
    assert_eq!(pool.items_per_block(), 16);
}

#[test]
fn test_stats_counters() {
    let pool = FixedPool::<NoLock>::new(64, 8).expect("failed to create pool");

    let a = pool.allocate().expect("allocation failed");
    let _run = pool.allocate_run(4).expect("run allocation failed");
    unsafe { pool.deallocate(a) };

    let stats = pool.stats();
    assert_eq!(stats.total_allocs, 5);
    assert_eq!(stats.total_deallocs, 1);
    assert_eq!(stats.handed_out_items, 5);
    assert_eq!(stats.free_items, 1);
    assert_eq!(stats.live_items, 4);
    assert_eq!(stats.capacity_items, 8);

    // Recycling a freed slot changes nothing about handed-out accounting.
    let b = pool.allocate().expect("allocation failed");
    assert_eq!(b, a);
    let stats = pool.stats();
    assert_eq!(stats.handed_out_items, 5);
    assert_eq!(stats.free_items, 0);
    assert_eq!(stats.live_items, 5);
}

#[test]
fn test_failed_run_leaves_pool_unchanged() {
    let pool = FixedPool::<NoLock>::new(64, 8).expect("failed to create pool");
    let before = pool.stats();

    assert!(pool.allocate_run(9).is_err());

    assert_eq!(pool.stats(), before);
}
