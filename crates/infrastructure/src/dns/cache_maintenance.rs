use super::cache::DnsCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Periodic background sweep of fully-expired cache entries.
///
/// Expired entries are otherwise purged lazily on the read that discovers
/// them; the sweep keeps idle caches from pinning dead entries until
/// eviction pressure arrives.
pub struct CacheMaintenanceJob {
    cache: Arc<DnsCache>,
    sweep_interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheMaintenanceJob {
    pub fn new(cache: Arc<DnsCache>) -> Self {
        Self {
            cache,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, sweep_interval_secs: u64) -> Self {
        self.sweep_interval_secs = sweep_interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn start(self) -> JoinHandle<()> {
        info!(
            interval_secs = self.sweep_interval_secs,
            "Starting cache maintenance job"
        );

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.sweep_interval_secs.max(1)));
            // The first tick completes immediately; skip it so the first
            // sweep runs one full interval after startup.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Cache maintenance job: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.cache.evict_expired();
                        if removed > 0 {
                            debug!(
                                removed,
                                cache_size = self.cache.len(),
                                "Cache sweep completed"
                            );
                        }
                    }
                }
            }
        })
    }
}
