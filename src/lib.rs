//! # fixed-pool
//!
//! Fixed-size object pool allocator for workloads dominated by frequent
//! short-lived objects of one uniform size: intrusive data-structure
//! nodes, language-runtime cells, message envelopes.
//!
//! The pool carves slots out of growing raw-memory blocks and recycles
//! freed slots through an intrusive freelist threaded through the slots'
//! own bytes:
//! - O(1) allocate and deallocate, LIFO recycling for cache locality
//! - Contiguous run allocation from blocks' never-used tails
//! - Live-set enumeration for leak hunting and GC-style integration
//! - Locking discipline selected by type parameter (none / mutex / spin)
//! - Flat C-callable surface for embedding into other runtimes
//!
//! ## Quick Start
//!
//! ```rust
//! use fixed_pool::FixedPool;
//!
//! // 64-byte slots, 256 slots per block.
//! let pool: FixedPool = FixedPool::new(64, 256)?;
//!
//! let a = pool.allocate()?;
//! let b = pool.allocate()?;
//! assert_eq!(pool.live_items().len(), 2);
//!
//! // SAFETY: both slots came from this pool and are returned once each.
//! unsafe {
//!     pool.deallocate(b);
//!     pool.deallocate(a);
//! }
//! assert!(pool.live_items().is_empty());
//! # Ok::<(), fixed_pool::PoolError>(())
//! ```
//!
//! ## Features
//!
//! - `logging`: `tracing` events on construction and block growth
//!
//! ## What the pool does not do
//!
//! No zeroing, no compaction, no double-free detection, no per-object
//! resizing, and no memory returned to the OS before the pool is dropped.
//! Deallocation trusts the caller; see
//! [`FixedPool::deallocate`]'s safety contract.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

mod block;

pub mod error;
pub mod ffi;
pub mod lock;
pub mod pool;
pub mod utils;

pub use crate::error::{PoolError, PoolResult};
pub use crate::lock::{
    DefaultLockPolicy, LockPolicy, MutexLock, NoLock, SpinGuard, SpinLock, ThreadSafePolicy,
};
pub use crate::pool::{FixedPool, PoolStats};

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::lock::{DefaultLockPolicy, LockPolicy, MutexLock, NoLock, SpinLock};
    pub use crate::pool::{FixedPool, PoolStats};
}
