use crate::errors::DnsError;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_max_recursion")]
    pub max_recursion: u32,

    /// Per-attempt budget for one upstream query, in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_connection_pool_size")]
    pub connection_pool_size: u32,

    /// Advisory only; validation is not performed.
    #[serde(default = "default_true")]
    pub enable_dnssec: bool,

    #[serde(default = "default_true")]
    pub enable_parallel_queries: bool,

    /// Upstream nameserver addresses. Must be non-empty.
    #[serde(default = "default_nameservers")]
    pub nameservers: Vec<IpAddr>,

    /// Port the nameservers are queried on.
    #[serde(default = "default_nameserver_port")]
    pub nameserver_port: u16,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_recursion: default_max_recursion(),
            query_timeout_ms: default_query_timeout_ms(),
            max_retries: default_max_retries(),
            connection_pool_size: default_connection_pool_size(),
            enable_dnssec: true,
            enable_parallel_queries: true,
            nameservers: default_nameservers(),
            nameserver_port: default_nameserver_port(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.nameservers.is_empty() {
            return Err(DnsError::ConfigError("No nameservers configured".into()));
        }
        if self.connection_pool_size == 0 {
            return Err(DnsError::ConfigError(
                "Connection pool size cannot be 0".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(DnsError::ConfigError("Max retries cannot be 0".into()));
        }
        if self.nameserver_port == 0 {
            return Err(DnsError::ConfigError("Nameserver port cannot be 0".into()));
        }
        if self.cache_max_entries == 0 {
            return Err(DnsError::ConfigError("Cache size cannot be 0".into()));
        }
        Ok(())
    }
}

fn default_max_recursion() -> u32 {
    10
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_connection_pool_size() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_nameservers() -> Vec<IpAddr> {
    vec![
        IpAddr::from([8, 8, 8, 8]),
        IpAddr::from([1, 1, 1, 1]),
    ]
}

fn default_nameserver_port() -> u16 {
    53
}

fn default_cache_max_entries() -> usize {
    1000
}
