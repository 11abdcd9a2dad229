//! Main pool manager implementation
//!
//! # Safety
//!
//! This module implements a fixed-size pool over raw slabs:
//! - Free slots store the next freelist link in their own first bytes
//!   (intrusive list, unaligned loads/stores)
//! - All state lives in an `UnsafeCell` and is only touched while the lock
//!   policy's guard is held
//! - Live slots are never read or written by the pool
//!
//! ## Invariants
//!
//! - Every slot is in exactly one state: unhanded (in some block's tail),
//!   live (owned by the caller), or free (reachable from `free_head`)
//! - The freelist has no cycles and no duplicates; traversal ends at null
//! - Per block, the handed-out slots are the prefix `0..(items_per_block -
//!   uninitialized_items)`, never an arbitrary subset
//! - Block buffers are stable for the pool's lifetime

use std::cell::UnsafeCell;
use std::collections::HashSet;
use std::mem;
use std::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::debug;

use crate::block::Block;
use crate::error::{PoolError, PoolResult};
use crate::lock::{DefaultLockPolicy, LockPolicy, ThreadSafePolicy};
use crate::pool::PoolStats;

/// State shared through the lock
struct PoolInner {
    blocks: Vec<Block>,
    /// Most recently freed slot, or null
    free_head: *mut u8,
    free_items: usize,
    total_allocs: u64,
    total_deallocs: u64,
}

/// Fixed-size object pool
///
/// Hands out raw slots of exactly `item_size` bytes, carved from blocks of
/// `items_per_block` slots each. Freed slots are recycled LIFO through a
/// freelist threaded through the slots' own bytes, so the most recently
/// freed (cache-hot) slot is returned first. Blocks are only released when
/// the pool is dropped.
///
/// The type parameter selects the locking discipline; see
/// [`LockPolicy`]. With [`NoLock`](crate::NoLock) the pool is not `Sync`
/// and must stay on one thread.
///
/// # Example
///
/// ```rust
/// use fixed_pool::FixedPool;
///
/// let pool: FixedPool = FixedPool::new(64, 256)?;
///
/// let item = pool.allocate()?;
/// // The slot is ours until we return it; the pool never touches it.
/// unsafe { item.as_ptr().cast::<u64>().write(7) };
/// assert_eq!(unsafe { item.as_ptr().cast::<u64>().read() }, 7);
///
/// // SAFETY: item came from this pool and is returned exactly once.
/// unsafe { pool.deallocate(item) };
/// # Ok::<(), fixed_pool::PoolError>(())
/// ```
pub struct FixedPool<L: LockPolicy = DefaultLockPolicy> {
    item_size: usize,
    items_per_block: usize,
    inner: UnsafeCell<PoolInner>,
    lock: L,
}

impl<L: LockPolicy> FixedPool<L> {
    /// Create a pool for items of `item_size` bytes, `items_per_block`
    /// slots per block.
    ///
    /// One block is created eagerly so the first allocation never pays the
    /// growth path.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidItemSize`] if `item_size` cannot hold a
    ///   pointer (free slots store their freelist link inline)
    /// - [`PoolError::InvalidBlockCapacity`] if `items_per_block` is zero
    /// - [`PoolError::SizeOverflow`] / [`PoolError::OutOfMemory`] from the
    ///   initial block
    pub fn new(item_size: usize, items_per_block: usize) -> PoolResult<Self> {
        let required = mem::size_of::<*mut u8>();
        if item_size < required {
            return Err(PoolError::invalid_item_size(item_size, required));
        }
        if items_per_block == 0 {
            return Err(PoolError::InvalidBlockCapacity);
        }

        let first = Block::new(item_size, items_per_block)?;

        #[cfg(feature = "logging")]
        debug!(item_size, items_per_block, "created fixed pool");

        Ok(Self {
            item_size,
            items_per_block,
            inner: UnsafeCell::new(PoolInner {
                blocks: vec![first],
                free_head: std::ptr::null_mut(),
                free_items: 0,
                total_allocs: 0,
                total_deallocs: 0,
            }),
            lock: L::default(),
        })
    }

    /// Create a pool sized for values of type `T`.
    ///
    /// The item size is `size_of::<T>()`, raised to the pointer size when
    /// `T` is smaller, since every slot must be able to hold a freelist
    /// link.
    pub fn for_type<T>(items_per_block: usize) -> PoolResult<Self> {
        let item_size = mem::size_of::<T>().max(mem::size_of::<*mut u8>());
        Self::new(item_size, items_per_block)
    }

    /// Size of each slot in bytes
    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of slots per block
    #[inline]
    pub fn items_per_block(&self) -> usize {
        self.items_per_block
    }

    /// Allocate one slot.
    ///
    /// Serves the most recently freed slot when the freelist is non-empty;
    /// otherwise takes the next slot from the newest block's uninitialized
    /// tail, growing by one block when that tail is exhausted. Older
    /// blocks' tails are never re-examined here: the fast path for
    /// recycling is the freelist, and any freelist slot is as good as any
    /// tail slot.
    ///
    /// The slot's contents are whatever was there before; the pool does
    /// not zero memory.
    ///
    /// # Errors
    ///
    /// [`PoolError::SizeOverflow`] / [`PoolError::OutOfMemory`] when a new
    /// block is needed and cannot be created. The pool is unchanged on
    /// failure.
    pub fn allocate(&self) -> PoolResult<NonNull<u8>> {
        let _guard = self.lock.lock();
        // SAFETY: Exclusive access to the inner state.
        // - the policy's guard is held for the rest of this call
        // - no reference to the inner state escapes this method
        let inner = unsafe { &mut *self.inner.get() };

        if let Some(head) = NonNull::new(inner.free_head) {
            // SAFETY: Popping the freelist.
            // - head was linked by deallocate(), so it points into one of
            //   our blocks and its first bytes hold the next link or null
            // - the load is unaligned because slot starts are spaced by
            //   item_size, not by pointer alignment
            inner.free_head = unsafe { head.as_ptr().cast::<*mut u8>().read_unaligned() };
            inner.free_items -= 1;
            inner.total_allocs += 1;
            return Ok(head);
        }

        let item = match inner.blocks.last_mut() {
            Some(block) if block.uninitialized_items() > 0 => {
                block.take_uninitialized(self.item_size, self.items_per_block, 1)
            },
            _ => {
                let index = Self::grow(inner, self.item_size, self.items_per_block)?;
                inner.blocks[index].take_uninitialized(self.item_size, self.items_per_block, 1)
            },
        };
        inner.total_allocs += 1;
        Ok(item)
    }

    /// Allocate `count` contiguous slots; returns the address of the first.
    ///
    /// Serves from the first block whose uninitialized tail still has
    /// `count` slots, scanning blocks in creation order, and grows by one
    /// block when none qualifies. The freelist is never consulted: freed
    /// slots are not contiguous.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidRunLength`] unless `1 <= count <=
    ///   items_per_block`
    /// - [`PoolError::SizeOverflow`] / [`PoolError::OutOfMemory`] when a
    ///   new block cannot be created
    pub fn allocate_run(&self, count: usize) -> PoolResult<NonNull<u8>> {
        if count == 0 || count > self.items_per_block {
            return Err(PoolError::invalid_run_length(count, self.items_per_block));
        }

        let _guard = self.lock.lock();
        // SAFETY: Guard held for the rest of this call; no inner reference
        // escapes.
        let inner = unsafe { &mut *self.inner.get() };

        for block in inner.blocks.iter_mut() {
            if block.uninitialized_items() >= count {
                inner.total_allocs += count as u64;
                return Ok(block.take_uninitialized(self.item_size, self.items_per_block, count));
            }
        }

        let index = Self::grow(inner, self.item_size, self.items_per_block)?;
        inner.total_allocs += count as u64;
        Ok(inner.blocks[index].take_uninitialized(self.item_size, self.items_per_block, count))
    }

    /// Return a slot to the pool.
    ///
    /// The slot becomes the new freelist head; its first pointer-sized
    /// bytes now belong to the pool, the rest keep whatever the caller
    /// left there. O(1): no membership check, no block lookup - use
    /// [`contains`](Self::contains) separately if you need one.
    ///
    /// # Safety
    ///
    /// - `item` must have been returned by [`allocate`](Self::allocate) or
    ///   [`allocate_run`](Self::allocate_run) on this pool
    /// - `item` must be live: not yet deallocated since it was handed out
    /// - the caller must not touch the slot's bytes afterwards
    ///
    /// Double frees, foreign pointers, and partial frees of a run corrupt
    /// the freelist.
    pub unsafe fn deallocate(&self, item: NonNull<u8>) {
        let _guard = self.lock.lock();
        // SAFETY: Guard held for the rest of this call.
        let inner = unsafe { &mut *self.inner.get() };

        // SAFETY: Pushing onto the freelist.
        // - item points at a live slot of at least pointer size (enforced
        //   at construction), so the link fits
        // - unaligned store because slot starts are spaced by item_size
        unsafe { item.as_ptr().cast::<*mut u8>().write_unaligned(inner.free_head) };
        inner.free_head = item.as_ptr();
        inner.free_items += 1;
        inner.total_deallocs += 1;
    }

    /// Snapshot the set of live slots.
    ///
    /// Collects every handed-out slot of every block, then walks the
    /// freelist and removes what it finds; the remainder is exactly the
    /// slots currently owned by callers. The snapshot is consistent as of
    /// the lock acquisition, but slots in it may be freed by other threads
    /// the moment this returns.
    ///
    /// O(handed-out slots + freelist length) - meant for leak hunting,
    /// correctness tests and GC-style integration, not for hot paths.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::FixedPool;
    ///
    /// let pool: FixedPool = FixedPool::new(64, 128)?;
    /// assert!(pool.live_items().is_empty());
    ///
    /// let item = pool.allocate()?;
    /// assert!(pool.live_items().contains(&item));
    ///
    /// // SAFETY: item came from this pool and is returned exactly once.
    /// unsafe { pool.deallocate(item) };
    /// assert!(pool.live_items().is_empty());
    /// # Ok::<(), fixed_pool::PoolError>(())
    /// ```
    pub fn live_items(&self) -> HashSet<NonNull<u8>> {
        let _guard = self.lock.lock();
        // SAFETY: Guard held for the rest of this call; shared access only.
        let inner = unsafe { &*self.inner.get() };

        let handed_out: usize = inner
            .blocks
            .iter()
            .map(|block| self.items_per_block - block.uninitialized_items())
            .sum();
        let mut live = HashSet::with_capacity(handed_out);

        // Everything handed out so far: live or free.
        for block in &inner.blocks {
            for index in 0..(self.items_per_block - block.uninitialized_items()) {
                let item = block.item_at(self.item_size, index);
                // SAFETY: item_at offsets a non-null block base within its
                // allocation.
                live.insert(unsafe { NonNull::new_unchecked(item) });
            }
        }

        // Subtract the free ones.
        let mut cursor = inner.free_head;
        while let Some(slot) = NonNull::new(cursor) {
            live.remove(&slot);
            // SAFETY: Every freelist node stores the next link (or null)
            // in its first bytes; unaligned load as in allocate().
            cursor = unsafe { slot.as_ptr().cast::<*mut u8>().read_unaligned() };
        }

        live
    }

    /// Whether `ptr` points into one of this pool's blocks.
    ///
    /// O(#blocks). Deliberately not part of
    /// [`deallocate`](Self::deallocate), which trusts its caller to stay
    /// O(1).
    pub fn contains(&self, ptr: *const u8) -> bool {
        let _guard = self.lock.lock();
        // SAFETY: Guard held; shared access only.
        let inner = unsafe { &*self.inner.get() };

        inner.blocks.iter().any(|block| block.contains(ptr))
    }

    /// Snapshot the pool's counters.
    pub fn stats(&self) -> PoolStats {
        let _guard = self.lock.lock();
        // SAFETY: Guard held; shared access only.
        let inner = unsafe { &*self.inner.get() };

        let capacity_items = inner.blocks.len() * self.items_per_block;
        let uninitialized: usize = inner.blocks.iter().map(Block::uninitialized_items).sum();
        let handed_out_items = capacity_items - uninitialized;

        PoolStats {
            total_allocs: inner.total_allocs,
            total_deallocs: inner.total_deallocs,
            blocks: inner.blocks.len(),
            capacity_items,
            handed_out_items,
            free_items: inner.free_items,
            live_items: handed_out_items - inner.free_items,
        }
    }

    /// Append a fresh block, returning its index.
    fn grow(inner: &mut PoolInner, item_size: usize, items_per_block: usize) -> PoolResult<usize> {
        inner.blocks.push(Block::new(item_size, items_per_block)?);

        #[cfg(feature = "logging")]
        debug!(blocks = inner.blocks.len(), "fixed pool grew by one block");

        Ok(inner.blocks.len() - 1)
    }
}

// SAFETY: FixedPool can move between threads.
// - the pool owns every block and the freelist threaded through them; the
//   raw pointers in PoolInner never reference foreign memory
// - L: Send covers the policy's own state
unsafe impl<L: LockPolicy + Send> Send for FixedPool<L> {}

// SAFETY: FixedPool can be shared between threads when the policy locks.
// - every operation holds the policy's guard for its entire duration
//   before touching PoolInner
// - L: ThreadSafePolicy guarantees the guards mutually exclude across
//   threads, so the UnsafeCell is never accessed concurrently
unsafe impl<L: ThreadSafePolicy + Sync> Sync for FixedPool<L> {}
