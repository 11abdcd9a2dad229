//! Raw storage blocks
//!
//! A [`Block`] is one contiguous slab of `item_size * items_per_block`
//! bytes plus a count of the trailing slots that have never been handed
//! out. The pool consumes that uninitialized tail front-to-back; freed
//! slots never return to it (they go to the pool's freelist instead), so
//! within a block the handed-out slots are always a prefix.

use std::alloc::{alloc, dealloc, Layout};
use std::mem;
use std::ptr::NonNull;

use crate::error::{PoolError, PoolResult};

/// A contiguous slab of item slots with an uninitialized tail
///
/// The buffer address is stable for the block's lifetime; blocks are only
/// dropped together with the owning pool. Blocks are move-only: moving one
/// transfers the buffer pointer, and `Vec` reallocation does not disturb
/// the buffer itself.
pub(crate) struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
    uninitialized_items: usize,
}

impl Block {
    /// Allocate a block for `items_per_block` slots of `item_size` bytes.
    ///
    /// The buffer is pointer-aligned so that slot 0 can hold a freelist
    /// link with a plain store; later slots use unaligned accesses because
    /// `item_size` need not be a multiple of the pointer size.
    pub(crate) fn new(item_size: usize, items_per_block: usize) -> PoolResult<Self> {
        let bytes = item_size
            .checked_mul(items_per_block)
            .ok_or_else(|| PoolError::size_overflow(item_size, items_per_block))?;

        let layout = Layout::from_size_align(bytes, mem::align_of::<*mut u8>())
            .map_err(|_| PoolError::size_overflow(item_size, items_per_block))?;

        // SAFETY: Allocating the slab via the global allocator.
        // - layout has non-zero size: the pool validates item_size >= pointer
        //   size and items_per_block >= 1 before constructing blocks
        // - alloc returns null on failure (mapped to OutOfMemory below)
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| PoolError::out_of_memory(bytes))?;

        Ok(Self {
            ptr,
            layout,
            uninitialized_items: items_per_block,
        })
    }

    /// Number of trailing slots never handed out
    #[inline]
    pub(crate) fn uninitialized_items(&self) -> usize {
        self.uninitialized_items
    }

    /// Address of the slot at `index`
    #[inline]
    pub(crate) fn item_at(&self, item_size: usize, index: usize) -> *mut u8 {
        debug_assert!(index * item_size < self.layout.size());

        // SAFETY: Computing a slot address inside the slab.
        // - callers index only slots below items_per_block, so the offset
        //   stays within the allocation made in new()
        unsafe { self.ptr.as_ptr().add(index * item_size) }
    }

    /// Hand out the next `count` slots of the uninitialized tail.
    ///
    /// Returns the address of the first slot. Callers must have checked
    /// `count <= uninitialized_items()`.
    pub(crate) fn take_uninitialized(
        &mut self,
        item_size: usize,
        items_per_block: usize,
        count: usize,
    ) -> NonNull<u8> {
        debug_assert!(count >= 1 && count <= self.uninitialized_items);

        let index = items_per_block - self.uninitialized_items;
        let item = self.item_at(item_size, index);
        self.uninitialized_items -= count;

        // SAFETY: item_at offsets a NonNull base within the allocation, so
        // the result is never null.
        unsafe { NonNull::new_unchecked(item) }
    }

    /// Whether `ptr` falls inside this block's buffer
    #[inline]
    pub(crate) fn contains(&self, ptr: *const u8) -> bool {
        let start = self.ptr.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + self.layout.size()
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: Releasing the slab.
        // - ptr was allocated in new() with exactly this layout
        // - Drop runs once; nothing else deallocates the buffer
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}
