use crate::metrics::snapshot::{AllocatorStats, CacheStats};
use crate::metrics::traits::{AllocatorMetricsRecorder, CacheMetricsRecorder};

#[derive(Debug, Default)]
pub struct AllocatorMetrics {
    pub total_allocs: u64,
    pub total_frees: u64,
    pub failed_allocs: u64,
    pub corruption_events: u64,
    pub pools_created: u64,
    pub pools_destroyed: u64,
    pub peak_used: usize,
}

impl AllocatorMetrics {
    /// Combines the counters with gauges read from the pool table.
    pub fn to_stats(
        &self,
        total_size: usize,
        used_size: usize,
        pool_count: usize,
        alloc_count: usize,
    ) -> AllocatorStats {
        AllocatorStats {
            total_size,
            used_size,
            peak_used: self.peak_used,
            pool_count,
            alloc_count,
            total_allocs: self.total_allocs,
            total_frees: self.total_frees,
            failed_allocs: self.failed_allocs,
            corruption_events: self.corruption_events,
            pools_created: self.pools_created,
            pools_destroyed: self.pools_destroyed,
        }
    }
}

impl AllocatorMetricsRecorder for AllocatorMetrics {
    fn record_alloc(&mut self, used_after: usize) {
        self.total_allocs += 1;
        self.peak_used = self.peak_used.max(used_after);
    }

    fn record_free(&mut self) {
        self.total_frees += 1;
    }

    fn record_alloc_failure(&mut self) {
        self.failed_allocs += 1;
    }

    fn record_corruption(&mut self) {
        self.corruption_events += 1;
    }

    fn record_pool_created(&mut self) {
        self.pools_created += 1;
    }

    fn record_pool_destroyed(&mut self) {
        self.pools_destroyed += 1;
    }
}

#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub get_hits: u64,
    pub get_misses: u64,
    pub insert_new: u64,
    pub insert_updates: u64,
    pub evicted_entries: u64,
    pub expired_entries: u64,
    pub flushes: u64,
}

impl CacheMetrics {
    pub fn to_stats(&self, size: usize, max_size: usize) -> CacheStats {
        CacheStats {
            hits: self.get_hits,
            misses: self.get_misses,
            evictions: self.evicted_entries,
            insertions: self.insert_new,
            updates: self.insert_updates,
            expirations: self.expired_entries,
            flushes: self.flushes,
            size,
            max_size,
        }
    }
}

impl CacheMetricsRecorder for CacheMetrics {
    fn record_get_hit(&mut self) {
        self.get_hits += 1;
    }

    fn record_get_miss(&mut self) {
        self.get_misses += 1;
    }

    fn record_insert_new(&mut self) {
        self.insert_new += 1;
    }

    fn record_insert_update(&mut self) {
        self.insert_updates += 1;
    }

    fn record_evicted_entry(&mut self) {
        self.evicted_entries += 1;
    }

    fn record_expired_entry(&mut self) {
        self.expired_entries += 1;
    }

    fn record_flush(&mut self) {
        self.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_tracks_high_water_mark() {
        let mut m = AllocatorMetrics::default();
        m.record_alloc(100);
        m.record_alloc(300);
        m.record_free();
        m.record_alloc(200);
        let stats = m.to_stats(1024, 200, 1, 2);
        assert_eq!(stats.peak_used, 300);
        assert_eq!(stats.total_allocs, 3);
        assert_eq!(stats.total_frees, 1);
        assert_eq!(stats.used_size, 200);
    }

    #[test]
    fn cache_counters_map_to_stats() {
        let mut m = CacheMetrics::default();
        m.record_get_hit();
        m.record_get_miss();
        m.record_get_miss();
        m.record_insert_new();
        m.record_insert_update();
        m.record_evicted_entry();
        m.record_expired_entry();
        m.record_flush();
        let stats = m.to_stats(1, 8);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!((stats.size, stats.max_size), (1, 8));
    }
}
