use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::{AllocatorStats, CacheStats};
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for allocator and cache snapshots.
///
/// Writes the Prometheus text exposition format so it can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector. Write errors are
/// dropped; exporting never fails the caller.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", suffix, value);
    }

    fn write_gauge(&self, suffix: &str, value: usize) {
        self.write_metric("gauge", suffix, value as u64);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<AllocatorStats> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &AllocatorStats) {
        self.write_counter("allocs_total", snapshot.total_allocs);
        self.write_counter("frees_total", snapshot.total_frees);
        self.write_counter("failed_allocs_total", snapshot.failed_allocs);
        self.write_counter("corruption_events_total", snapshot.corruption_events);
        self.write_counter("pools_created_total", snapshot.pools_created);
        self.write_counter("pools_destroyed_total", snapshot.pools_destroyed);
        self.write_gauge("total_bytes", snapshot.total_size);
        self.write_gauge("used_bytes", snapshot.used_size);
        self.write_gauge("peak_used_bytes", snapshot.peak_used);
        self.write_gauge("pools", snapshot.pool_count);
        self.write_gauge("live_allocs", snapshot.alloc_count);
    }
}

impl<W: Write + Send> MetricsExporter<CacheStats> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheStats) {
        self.write_counter("get_hits_total", snapshot.hits);
        self.write_counter("get_misses_total", snapshot.misses);
        self.write_counter("insert_new_total", snapshot.insertions);
        self.write_counter("insert_updates_total", snapshot.updates);
        self.write_counter("evicted_entries_total", snapshot.evictions);
        self.write_counter("expired_entries_total", snapshot.expirations);
        self.write_counter("flushes_total", snapshot.flushes);
        self.write_gauge("cache_len", snapshot.size);
        self.write_gauge("capacity", snapshot.max_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_snapshot_is_prefixed() {
        let exporter = PrometheusTextExporter::new("kv", Vec::new());
        exporter.export(&CacheStats {
            hits: 5,
            flushes: 1,
            size: 2,
            max_size: 10,
            ..Default::default()
        });
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE kv_get_hits_total counter\nkv_get_hits_total 5\n"));
        assert!(text.contains("# TYPE kv_capacity gauge\nkv_capacity 10\n"));
        assert!(text.contains("kv_flushes_total 1\n"));
    }

    #[test]
    fn allocator_snapshot_without_prefix() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&AllocatorStats {
            used_size: 96,
            corruption_events: 1,
            ..Default::default()
        });
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("used_bytes 96\n"));
        assert!(text.contains("corruption_events_total 1\n"));
    }
}
