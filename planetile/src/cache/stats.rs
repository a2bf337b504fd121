//! Cache statistics tracking and reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::traits::DistributedDiagnostics;

/// Process-wide request counters, updated lock-free.
///
/// Counts are advisory: concurrent updates may be observed slightly out of
/// step with each other.
#[derive(Debug, Default)]
pub struct CacheCounters {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    distributed_hits: AtomicU64,
    distributed_misses: AtomicU64,
    distributed_errors: AtomicU64,
    total_requests: AtomicU64,
}

impl CacheCounters {
    /// Count a cache lookup.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup answered by the memory tier.
    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup the memory tier could not answer.
    pub fn record_memory_miss(&self) {
        self.memory_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup answered by the distributed tier.
    pub fn record_distributed_hit(&self) {
        self.distributed_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup missing from both tiers.
    pub fn record_distributed_miss(&self) {
        self.distributed_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed distributed tier operation.
    pub fn record_distributed_error(&self) {
        self.distributed_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into a statistics report.
    ///
    /// Occupancy and diagnostics are left for the caller to fill in.
    pub fn snapshot(&self) -> CacheStatistics {
        CacheStatistics {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            memory_misses: self.memory_misses.load(Ordering::Relaxed),
            distributed_hits: self.distributed_hits.load(Ordering::Relaxed),
            distributed_misses: self.distributed_misses.load(Ordering::Relaxed),
            distributed_errors: self.distributed_errors.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            ..CacheStatistics::default()
        }
    }
}

/// Point-in-time view of cache behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatistics {
    // Request counters
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub distributed_hits: u64,
    pub distributed_misses: u64,
    /// Distributed operations that failed and were degraded to a miss.
    pub distributed_errors: u64,
    pub total_requests: u64,

    // Memory tier occupancy
    pub memory_entries: u64,
    pub memory_capacity: u64,
    pub memory_evictions: u64,

    /// Server-side figures, when the distributed tier answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributed: Option<DistributedDiagnostics>,
    /// Why the distributed figures are missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributed_error: Option<String>,
}

impl CacheStatistics {
    /// Memory tier hit rate as a percentage, `None` before the first lookup.
    pub fn memory_hit_rate(&self) -> Option<f64> {
        percentage(self.memory_hits, self.memory_hits + self.memory_misses)
    }

    /// Distributed tier hit rate as a percentage, `None` before the first lookup.
    pub fn distributed_hit_rate(&self) -> Option<f64> {
        percentage(
            self.distributed_hits,
            self.distributed_hits + self.distributed_misses,
        )
    }

    /// Share of requests served by either tier, as a percentage.
    pub fn overall_hit_rate(&self) -> Option<f64> {
        percentage(self.memory_hits + self.distributed_hits, self.total_requests)
    }

    /// Render the statistics and derived rates as a JSON document.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            for (name, rate) in [
                ("memory_hit_rate", self.memory_hit_rate()),
                ("distributed_hit_rate", self.distributed_hit_rate()),
                ("overall_hit_rate", self.overall_hit_rate()),
            ] {
                if let Some(rate) = rate {
                    map.insert(name.to_string(), serde_json::json!(format!("{:.2}%", rate)));
                }
            }
        }
        value
    }
}

fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_absent_without_traffic() {
        let stats = CacheCounters::default().snapshot();
        assert_eq!(stats.memory_hit_rate(), None);
        assert_eq!(stats.distributed_hit_rate(), None);
        assert_eq!(stats.overall_hit_rate(), None);
    }

    #[test]
    fn test_rates() {
        let counters = CacheCounters::default();
        // 4 requests: 1 memory hit, 2 distributed hits, 1 full miss
        for _ in 0..4 {
            counters.record_request();
        }
        counters.record_memory_hit();
        for _ in 0..3 {
            counters.record_memory_miss();
        }
        counters.record_distributed_hit();
        counters.record_distributed_hit();
        counters.record_distributed_miss();

        let stats = counters.snapshot();
        assert_eq!(stats.memory_hit_rate(), Some(25.0));
        assert!((stats.distributed_hit_rate().unwrap() - 66.666).abs() < 0.01);
        assert_eq!(stats.overall_hit_rate(), Some(75.0));
    }

    #[test]
    fn test_json_includes_rates_and_skips_missing_diagnostics() {
        let counters = CacheCounters::default();
        counters.record_request();
        counters.record_memory_hit();

        let json = counters.snapshot().to_json();
        assert_eq!(json["memory_hits"], 1);
        assert_eq!(json["memory_hit_rate"], "100.00%");
        assert!(json.get("distributed_hit_rate").is_none());
        assert!(json.get("distributed").is_none());
    }
}
