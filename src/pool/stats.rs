//! Pool statistics

/// Statistics snapshot for a pool
///
/// Produced by [`FixedPool::stats`](crate::FixedPool::stats) under the
/// pool's lock, so the fields are mutually consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total slot allocations performed (runs count each slot)
    pub total_allocs: u64,
    /// Total deallocations performed
    pub total_deallocs: u64,
    /// Number of blocks created so far
    pub blocks: usize,
    /// Total slots across all blocks
    pub capacity_items: usize,
    /// Slots handed out at least once
    pub handed_out_items: usize,
    /// Slots currently on the freelist
    pub free_items: usize,
    /// Slots currently owned by callers
    pub live_items: usize,
}
