use async_trait::async_trait;
use rdns_domain::{DnsError, DnsQuery, DnsRecord};

/// Port for resolution backends. The records come back in merge order:
/// per-nameserver order inside the configured nameserver order.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, query: &DnsQuery) -> Result<Vec<DnsRecord>, DnsError>;
}
