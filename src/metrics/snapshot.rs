use std::ops::Add;

/// Point-in-time allocator statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Sum of all pool arena sizes.
    pub total_size: usize,
    /// Bytes charged to live blocks, headers and guards included.
    pub used_size: usize,
    /// High-water mark of `used_size`.
    pub peak_used: usize,
    pub pool_count: usize,
    /// Live allocations.
    pub alloc_count: usize,

    pub total_allocs: u64,
    pub total_frees: u64,
    pub failed_allocs: u64,
    pub corruption_events: u64,
    pub pools_created: u64,
    pub pools_destroyed: u64,
}

impl AllocatorStats {
    /// Bytes not charged to any live block.
    pub fn free_size(&self) -> usize {
        self.total_size.saturating_sub(self.used_size)
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub insertions: u64,
    pub updates: u64,
    pub expirations: u64,
    pub flushes: u64,

    // gauges captured at snapshot time
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Summing shard snapshots.
impl Add for CacheStats {
    type Output = CacheStats;

    fn add(self, rhs: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
            evictions: self.evictions + rhs.evictions,
            insertions: self.insertions + rhs.insertions,
            updates: self.updates + rhs.updates,
            expirations: self.expirations + rhs.expirations,
            flushes: self.flushes + rhs.flushes,
            size: self.size + rhs.size,
            max_size: self.max_size + rhs.max_size,
        }
    }
}

impl std::iter::Sum for CacheStats {
    fn sum<I: Iterator<Item = CacheStats>>(iter: I) -> Self {
        iter.fold(CacheStats::default(), Add::add)
    }
}
