use rdns_application::ports::{CounterSink, StatisticsSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic resolution counters.
///
/// The counters are independent atomics; a snapshot taken mid-resolution
/// may observe `total_queries` lagging `cache_hits + cache_misses` by the
/// queries currently between those increments.
#[derive(Debug, Default)]
pub struct ResolverStatistics {
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    failed_queries: AtomicU64,
    total_resolution_nanos: AtomicU64,
}

impl ResolverStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterSink for ResolverStatistics {
    fn record_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn add_resolution_time(&self, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.total_resolution_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatisticsSnapshot {
        let total_queries = self.total_queries.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let failed_queries = self.failed_queries.load(Ordering::Relaxed);
        let total_nanos = self.total_resolution_nanos.load(Ordering::Relaxed);

        let (hit_rate, avg_resolution_time) = if total_queries == 0 {
            (0.0, Duration::ZERO)
        } else {
            (
                cache_hits as f64 / total_queries as f64,
                Duration::from_nanos(total_nanos / total_queries),
            )
        };

        StatisticsSnapshot {
            total_queries,
            cache_hits,
            cache_misses,
            failed_queries,
            total_resolution_time: Duration::from_nanos(total_nanos),
            hit_rate,
            avg_resolution_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_has_zero_derived_metrics() {
        let stats = ResolverStatistics::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot, StatisticsSnapshot::empty());
    }

    #[test]
    fn test_derived_metrics() {
        let stats = ResolverStatistics::new();
        for _ in 0..4 {
            stats.record_query();
        }
        stats.record_cache_hit();
        stats.record_cache_miss();
        stats.record_cache_miss();
        stats.record_cache_miss();
        stats.record_failure();
        stats.add_resolution_time(Duration::from_millis(20));
        stats.add_resolution_time(Duration::from_millis(60));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_queries, 4);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 3);
        assert_eq!(snapshot.failed_queries, 1);
        assert!(snapshot.cache_hits + snapshot.cache_misses <= snapshot.total_queries);
        assert_eq!(snapshot.hit_rate, 0.25);
        assert_eq!(snapshot.total_resolution_time, Duration::from_millis(80));
        assert_eq!(snapshot.avg_resolution_time, Duration::from_millis(20));
    }
}
