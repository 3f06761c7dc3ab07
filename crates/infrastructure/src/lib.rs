pub mod dns;
pub mod logging;
pub mod statistics;

pub use dns::cache::{CacheKey, DnsCache};
pub use dns::cache_maintenance::CacheMaintenanceJob;
pub use dns::codec::{MessageBuilder, ResponseParser};
pub use dns::pool::{ConnectionPool, PooledConnection};
pub use dns::resolver::RecursiveResolver;
pub use logging::{MemoryLogSink, TracingLogSink};
pub use statistics::ResolverStatistics;
