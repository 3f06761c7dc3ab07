use std::time::Duration;

/// Coherent view of the resolution counters at one observation point.
///
/// The underlying counters are independent atomics, so a snapshot taken
/// while queries are in flight may briefly observe `total_queries` lagging
/// `cache_hits + cache_misses`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSnapshot {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failed_queries: u64,
    pub total_resolution_time: Duration,
    pub hit_rate: f64,
    pub avg_resolution_time: Duration,
}

impl StatisticsSnapshot {
    pub fn empty() -> Self {
        Self {
            total_queries: 0,
            cache_hits: 0,
            cache_misses: 0,
            failed_queries: 0,
            total_resolution_time: Duration::ZERO,
            hit_rate: 0.0,
            avg_resolution_time: Duration::ZERO,
        }
    }
}

/// Port for resolution accounting. All methods must be safe to call from
/// concurrent resolve calls.
pub trait CounterSink: Send + Sync {
    fn record_query(&self);
    fn record_cache_hit(&self);
    fn record_cache_miss(&self);
    fn record_failure(&self);
    fn add_resolution_time(&self, elapsed: Duration);
    fn snapshot(&self) -> StatisticsSnapshot;
}
