//! Flat C-callable surface
//!
//! Exposes the pool as an opaque handle plus free functions, suitable for
//! embedding into foreign runtimes. Every failure surfaces as a null
//! return; no errors cross the boundary.
//!
//! The live-item snapshot array is allocated with `malloc` so the release
//! side needs nothing but the pointer, mirroring the usual C contract.

use std::mem;
use std::ptr::{self, NonNull};

use crate::lock::DefaultLockPolicy;
use crate::pool::FixedPool;

/// Pool type behind the opaque handle
pub type Pool = FixedPool<DefaultLockPolicy>;

/// Create a pool; returns null on invalid sizes or out-of-memory.
#[no_mangle]
pub extern "C" fn fixed_pool_new(item_size: usize, items_per_block: usize) -> *mut Pool {
    match Pool::new(item_size, items_per_block) {
        Ok(pool) => Box::into_raw(Box::new(pool)),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a pool, releasing every block.
///
/// # Safety
///
/// `pool` must be null or a handle from [`fixed_pool_new`] that has not
/// been destroyed. The handle and every slot from it are invalid
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_destroy(pool: *mut Pool) {
    if pool.is_null() {
        return;
    }
    // SAFETY: per the contract above, pool came from Box::into_raw in
    // fixed_pool_new and is destroyed exactly once.
    drop(unsafe { Box::from_raw(pool) });
}

/// Allocate one slot; returns null on failure.
///
/// # Safety
///
/// `pool` must be a live handle from [`fixed_pool_new`].
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_alloc(pool: *mut Pool) -> *mut u8 {
    // SAFETY: the contract guarantees a live handle.
    let pool = unsafe { &*pool };
    match pool.allocate() {
        Ok(item) => item.as_ptr(),
        Err(_) => ptr::null_mut(),
    }
}

/// Allocate `count` contiguous slots; returns the first, or null on
/// failure or when `count` is zero or exceeds the pool's items-per-block.
///
/// # Safety
///
/// `pool` must be a live handle from [`fixed_pool_new`].
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_alloc_run(pool: *mut Pool, count: usize) -> *mut u8 {
    // SAFETY: the contract guarantees a live handle.
    let pool = unsafe { &*pool };
    match pool.allocate_run(count) {
        Ok(item) => item.as_ptr(),
        Err(_) => ptr::null_mut(),
    }
}

/// Return a slot to the pool. Null is ignored.
///
/// # Safety
///
/// `pool` must be a live handle from [`fixed_pool_new`]; `item` must be
/// null or a live slot allocated from that pool. Double frees and foreign
/// pointers are undefined behavior.
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_free(pool: *mut Pool, item: *mut u8) {
    // SAFETY: the contract guarantees a live handle.
    let pool = unsafe { &*pool };
    if let Some(item) = NonNull::new(item) {
        // SAFETY: the contract guarantees a live slot from this pool.
        unsafe { pool.deallocate(item) };
    }
}

/// Snapshot the live slots into a `malloc`ed array.
///
/// Writes the element count through `out_count` and returns the array, or
/// null when the array cannot be allocated (`*out_count` is zero in that
/// case). The array is a copy: it stays valid after the pool moves on,
/// but the slots it names may be freed by other threads at any time.
/// Release it with [`fixed_pool_release_live_items`].
///
/// # Safety
///
/// `pool` must be a live handle from [`fixed_pool_new`]; `out_count` must
/// point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_live_items(
    pool: *mut Pool,
    out_count: *mut usize,
) -> *mut *mut u8 {
    // SAFETY: the contract guarantees a live handle and writable out_count.
    let pool = unsafe { &*pool };
    unsafe { out_count.write(0) };

    let live = pool.live_items();

    // SAFETY: malloc with any size is sound; null is handled below.
    let array =
        unsafe { libc::malloc(live.len() * mem::size_of::<*mut u8>()) }.cast::<*mut u8>();
    if array.is_null() {
        return ptr::null_mut();
    }

    for (index, item) in live.iter().enumerate() {
        // SAFETY: array holds live.len() pointer slots; index < live.len().
        unsafe { array.add(index).write(item.as_ptr()) };
    }
    // SAFETY: out_count is writable per the contract.
    unsafe { out_count.write(live.len()) };

    array
}

/// Release an array obtained from [`fixed_pool_live_items`]. Null is
/// ignored.
///
/// # Safety
///
/// `items` must be null or an array returned by [`fixed_pool_live_items`]
/// that has not been released.
#[no_mangle]
pub unsafe extern "C" fn fixed_pool_release_live_items(items: *mut *mut u8) {
    // SAFETY: items came from malloc in fixed_pool_live_items, or is null;
    // free accepts both.
    unsafe { libc::free(items.cast()) };
}
