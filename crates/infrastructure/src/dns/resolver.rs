//! Recursive resolver engine: cache lookup, parallel fan-out to the
//! configured upstreams, bounded NS recursion, and CNAME chasing.

use super::cache::{CacheKey, DnsCache};
use super::pool::ConnectionPool;
use super::transport;
use crate::logging::TracingLogSink;
use crate::statistics::ResolverStatistics;
use async_trait::async_trait;
use futures::future::BoxFuture;
use rdns_application::ports::{CounterSink, DnsResolver, LogLevel, LogSink, StatisticsSnapshot};
use rdns_domain::{DnsError, DnsQuery, DnsRecord, RecordType, ResolverConfig};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// The public resolver. Cheap to clone; every clone shares the cache,
/// pool, sinks, and configuration.
#[derive(Clone)]
pub struct RecursiveResolver {
    config: Arc<RwLock<Arc<ResolverConfig>>>,
    cache: Arc<DnsCache>,
    pool: Arc<ConnectionPool>,
    logger: Arc<dyn LogSink>,
    counters: Arc<dyn CounterSink>,
}

impl RecursiveResolver {
    pub async fn new(config: ResolverConfig) -> Result<Self, DnsError> {
        Self::with_sinks(
            config,
            Arc::new(TracingLogSink::new()),
            Arc::new(ResolverStatistics::new()),
        )
        .await
    }

    pub async fn with_sinks(
        config: ResolverConfig,
        logger: Arc<dyn LogSink>,
        counters: Arc<dyn CounterSink>,
    ) -> Result<Self, DnsError> {
        config.validate()?;

        let servers: Vec<SocketAddr> = config
            .nameservers
            .iter()
            .map(|&address| SocketAddr::new(address, config.nameserver_port))
            .collect();
        let pool = ConnectionPool::new(config.connection_pool_size as usize, &servers).await?;
        let cache = DnsCache::new(config.cache_max_entries);

        Ok(Self {
            config: Arc::new(RwLock::new(Arc::new(config))),
            cache: Arc::new(cache),
            pool: Arc::new(pool),
            logger,
            counters,
        })
    }

    /// Replaces the configuration for subsequent resolutions. In-flight
    /// calls keep the snapshot they started with. The pool keeps the
    /// endpoints it was built with; nameservers first named here are
    /// reached through one-shot sockets.
    pub fn set_config(&self, config: ResolverConfig) -> Result<(), DnsError> {
        config.validate()?;
        *self
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        Ok(())
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.counters.snapshot()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Shared cache handle, for wiring up background maintenance.
    pub fn cache(&self) -> Arc<DnsCache> {
        Arc::clone(&self.cache)
    }

    pub async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        self.counters.record_query();
        let started = Instant::now();

        match self.resolve_inner(domain, record_type, started).await {
            Ok(records) => Ok(records),
            Err(error) => {
                self.counters.record_failure();
                self.logger.log(
                    LogLevel::Error,
                    &format!("Resolution failed for {}: {}", domain, error),
                );
                Err(error)
            }
        }
    }

    /// Submits the resolution to the runtime and returns an awaitable
    /// handle.
    pub fn resolve_async(
        &self,
        domain: impl Into<String>,
        record_type: RecordType,
    ) -> JoinHandle<Result<Vec<DnsRecord>, DnsError>> {
        let resolver = self.clone();
        let domain = domain.into();
        tokio::spawn(async move { resolver.resolve(&domain, record_type).await })
    }

    async fn resolve_inner(
        &self,
        domain: &str,
        record_type: RecordType,
        started: Instant,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        let config = self.config_snapshot();

        let key = CacheKey::new(domain, record_type);
        if let Some(records) = self.cache.get(&key) {
            self.counters.record_cache_hit();
            self.logger
                .log(LogLevel::Debug, &format!("Cache hit for {}", key));
            return Ok(records);
        }
        self.counters.record_cache_miss();

        let mut records = if config.enable_parallel_queries {
            self.resolve_parallel(domain, record_type, &config).await?
        } else {
            let first = *config.nameservers.first().ok_or(DnsError::NoNameservers)?;
            self.recursive_resolution(domain, record_type, 0, first, &config)
                .await?
        };

        if !self
            .follow_cname_chain(&mut records, domain, &config)
            .await?
        {
            return Err(DnsError::CnameResolutionFailed);
        }

        if config.enable_dnssec {
            // The flag is advisory; validation is not implemented.
            self.logger.log(
                LogLevel::Debug,
                &format!("Skipping DNSSEC validation for {}", domain),
            );
        }

        self.cache.put(key, records.clone());
        self.counters.add_resolution_time(started.elapsed());
        Ok(records)
    }

    /// Queries every configured nameserver concurrently and concatenates
    /// the results in configured nameserver order. A failed branch is
    /// logged at WARNING and contributes nothing; the fan-out fails only
    /// when every branch does, surfacing the first branch error.
    async fn resolve_parallel(
        &self,
        domain: &str,
        record_type: RecordType,
        config: &Arc<ResolverConfig>,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        let domain: Arc<str> = Arc::from(domain);

        let mut handles = Vec::with_capacity(config.nameservers.len());
        for &server in &config.nameservers {
            let resolver = self.clone();
            let domain = Arc::clone(&domain);
            let config = Arc::clone(config);
            handles.push((
                server,
                tokio::spawn(async move {
                    resolver
                        .query_nameserver(server, &domain, record_type, &config)
                        .await
                }),
            ));
        }

        let mut merged = Vec::new();
        let mut first_error: Option<DnsError> = None;
        let mut any_succeeded = false;

        for (server, handle) in handles {
            match handle.await {
                Ok(Ok(records)) => {
                    any_succeeded = true;
                    merged.extend(records);
                }
                Ok(Err(error)) => {
                    self.logger.log(
                        LogLevel::Warning,
                        &format!("Parallel resolution via {} failed: {}", server, error),
                    );
                    first_error.get_or_insert(error);
                }
                Err(join_error) => {
                    self.logger.log(
                        LogLevel::Warning,
                        &format!("Parallel resolution task for {} aborted: {}", server, join_error),
                    );
                    first_error.get_or_insert(DnsError::Io(join_error.to_string()));
                }
            }
        }

        if !any_succeeded {
            return Err(first_error.unwrap_or(DnsError::NoNameservers));
        }
        Ok(merged)
    }

    /// One upstream query with retry: up to `max_retries` attempts, each
    /// bounded by `query_timeout_ms`. Destinations the pool serves go
    /// through it; anything else gets a one-shot socket.
    async fn query_nameserver(
        &self,
        server: IpAddr,
        domain: &str,
        record_type: RecordType,
        config: &ResolverConfig,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        let target = SocketAddr::new(server, config.nameserver_port);
        self.logger.log(
            LogLevel::Debug,
            &format!("Querying {} for {}", target, domain),
        );

        let attempt_budget = Duration::from_millis(config.query_timeout_ms);
        let mut last_error: Option<DnsError> = None;

        for attempt in 1..=config.max_retries {
            match tokio::time::timeout(
                attempt_budget,
                self.query_once(target, domain, record_type),
            )
            .await
            {
                Ok(Ok(records)) => {
                    if records.is_empty() {
                        self.logger.log(
                            LogLevel::Warning,
                            &format!("No records returned for {}", domain),
                        );
                    } else {
                        self.logger.log(
                            LogLevel::Debug,
                            &format!("Records returned for {}: {}", domain, records.len()),
                        );
                    }
                    return Ok(records);
                }
                Ok(Err(error)) => {
                    debug!(server = %target, attempt, error = %error, "Query attempt failed");
                    last_error = Some(error);
                }
                Err(_) => {
                    debug!(
                        server = %target,
                        attempt,
                        timeout_ms = config.query_timeout_ms,
                        "Query attempt timed out"
                    );
                    last_error = Some(DnsError::RecvFailed(format!(
                        "query to {} timed out after {}ms",
                        target, config.query_timeout_ms
                    )));
                }
            }
        }

        Err(last_error.unwrap_or(DnsError::PoolAcquireFailed))
    }

    async fn query_once(
        &self,
        target: SocketAddr,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        if self.pool.serves(&target) {
            // The guard releases (or retires) the endpoint on every path,
            // including cancellation by the attempt timeout.
            let mut conn = self.pool.acquire(target).await?;
            conn.send_query(domain, record_type).await?;
            conn.receive().await
        } else {
            transport::query_oneshot(target, domain, record_type).await
        }
    }

    /// Sequential resolution: query `server`, then chase each NS
    /// delegation whose target is an address literal, appending the
    /// delegated results. Depth is bounded by `max_recursion`.
    fn recursive_resolution<'a>(
        &'a self,
        domain: &'a str,
        record_type: RecordType,
        depth: u32,
        server: IpAddr,
        config: &'a Arc<ResolverConfig>,
    ) -> BoxFuture<'a, Result<Vec<DnsRecord>, DnsError>> {
        Box::pin(async move {
            if depth >= config.max_recursion {
                return Err(DnsError::RecursionLimit);
            }

            let mut records = self
                .query_nameserver(server, domain, record_type, config)
                .await?;

            let delegations: Vec<IpAddr> = records
                .iter()
                .filter(|record| record.record_type == RecordType::NS)
                .filter_map(|record| record.data.first())
                .filter_map(|target| match target.parse::<IpAddr>() {
                    Ok(address) => Some(address),
                    Err(_) => {
                        debug!(
                            nameserver = %target,
                            "NS target is not an address literal, skipping delegation"
                        );
                        None
                    }
                })
                .collect();

            for delegate in delegations {
                let delegated = self
                    .recursive_resolution(domain, record_type, depth + 1, delegate, config)
                    .await?;
                records.extend(delegated);
            }

            Ok(records)
        })
    }

    /// Chases CNAMEs left to right: each newly seen CNAME's target is
    /// resolved as an A query and the results appended, then the scan
    /// resumes after it so no CNAME is chased twice. Returns `false` when
    /// the chain length reaches `max_recursion`.
    fn follow_cname_chain<'a>(
        &'a self,
        records: &'a mut Vec<DnsRecord>,
        original_domain: &'a str,
        config: &'a ResolverConfig,
    ) -> BoxFuture<'a, Result<bool, DnsError>> {
        Box::pin(async move {
            let mut depth = 0u32;
            let mut scan_from = 0usize;

            loop {
                let found = records[scan_from..]
                    .iter()
                    .position(|record| {
                        record.record_type == RecordType::CNAME && !record.data.is_empty()
                    })
                    .map(|offset| scan_from + offset);

                let Some(index) = found else {
                    return Ok(true);
                };

                if depth >= config.max_recursion {
                    self.logger.log(
                        LogLevel::Warning,
                        &format!(
                            "CNAME chain for {} exceeded depth {}",
                            original_domain, config.max_recursion
                        ),
                    );
                    return Ok(false);
                }

                let target = records[index].data[0].clone();
                debug!(domain = %original_domain, cname = %target, depth, "Following CNAME");

                // Boxed to break the resolve -> chase -> resolve future cycle.
                let chase: BoxFuture<'_, Result<Vec<DnsRecord>, DnsError>> =
                    Box::pin(self.resolve(&target, RecordType::A));
                records.extend(chase.await?);

                scan_from = index + 1;
                depth += 1;
            }
        })
    }

    fn config_snapshot(&self) -> Arc<ResolverConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DnsResolver for RecursiveResolver {
    async fn resolve(&self, query: &DnsQuery) -> Result<Vec<DnsRecord>, DnsError> {
        RecursiveResolver::resolve(self, &query.domain, query.record_type).await
    }
}
