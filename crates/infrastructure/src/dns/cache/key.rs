use rdns_domain::RecordType;
use std::fmt;

/// Cache lookups are keyed by the (domain, type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub domain: String,
    pub record_type: RecordType,
}

impl CacheKey {
    pub fn new(domain: &str, record_type: RecordType) -> Self {
        Self {
            domain: domain.to_string(),
            record_type,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.domain, self.record_type.to_u16())
    }
}
