pub mod config;
pub mod dns_query;
pub mod dns_record;
pub mod errors;

pub use config::ResolverConfig;
pub use dns_query::DnsQuery;
pub use dns_record::{DnsRecord, MxData, RecordType, SoaData};
pub use errors::DnsError;
