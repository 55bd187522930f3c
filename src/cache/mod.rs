//! Two-tier artwork cache.
//!
//! 1. **Memory** ([`MemoryCache`]) - decoded images, LRU by entry count and bytes
//! 2. **Disk** ([`DiskCache`]) - encoded images, LRU by entry count and bytes, plus max age
//!
//! Both tiers carry a *generation* counter bumped by `clear`. Writers that
//! captured a generation before a clear are refused afterwards, so a slow
//! download can never resurrect an entry the user just cleared.

mod disk;
mod memory;
mod store;

pub use disk::{DiskCache, DiskLimits};
pub use memory::MemoryCache;
pub use store::{CacheGeneration, CacheStats, CacheStore};

/// Errors from the cache tiers.
///
/// Callers in the resolver treat all of these as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache was cleared while the write was in flight")]
    StaleGeneration,

    #[error("Entry of {size} bytes exceeds the {budget} byte budget")]
    TooLarge { size: u64, budget: u64 },
}

/// Occupancy of a single tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub entries: usize,
    pub bytes: u64,
    pub max_entries: usize,
    pub max_bytes: u64,
}
