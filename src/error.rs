//! Error types for pool operations

use std::fmt;

/// Result type for pool operations
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Pool operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Item size cannot hold a freelist link
    InvalidItemSize { item_size: usize, required: usize },

    /// Zero items per block
    InvalidBlockCapacity,

    /// Run length outside `1..=items_per_block`
    InvalidRunLength { count: usize, items_per_block: usize },

    /// `item_size * items_per_block` does not fit in `usize`
    SizeOverflow { item_size: usize, items_per_block: usize },

    /// The underlying allocator returned no memory
    OutOfMemory { requested: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidItemSize { item_size, required } => {
                write!(
                    f,
                    "invalid item size: {} bytes, must be at least {} to store a freelist link",
                    item_size, required
                )
            },
            Self::InvalidBlockCapacity => {
                write!(f, "invalid block capacity: blocks must hold at least one item")
            },
            Self::InvalidRunLength { count, items_per_block } => {
                write!(
                    f,
                    "invalid run length {}: runs must span 1..={} items",
                    count, items_per_block
                )
            },
            Self::SizeOverflow { item_size, items_per_block } => {
                write!(
                    f,
                    "block size overflow: {} items of {} bytes exceeds the address space",
                    items_per_block, item_size
                )
            },
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: requested {} bytes", requested)
            },
        }
    }
}

impl std::error::Error for PoolError {}

impl PoolError {
    /// Create an invalid item size error
    pub fn invalid_item_size(item_size: usize, required: usize) -> Self {
        Self::InvalidItemSize { item_size, required }
    }

    /// Create an invalid run length error
    pub fn invalid_run_length(count: usize, items_per_block: usize) -> Self {
        Self::InvalidRunLength { count, items_per_block }
    }

    /// Create a size overflow error
    pub fn size_overflow(item_size: usize, items_per_block: usize) -> Self {
        Self::SizeOverflow { item_size, items_per_block }
    }

    /// Create an out of memory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }
}
