use super::RecordType;
use std::hash::{Hash, Hasher};

/// MX sidecar: preference and exchange host, decoded alongside the
/// formatted `data` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxData {
    pub preference: u16,
    pub exchange: String,
}

/// SOA sidecar fields per RFC 1035 §3.3.13.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaData {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// One decoded answer record.
///
/// Equality covers `(record_type, name, data)` only; `ttl` and the typed
/// sidecars decay or repeat across responses and do not identify a record.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub record_type: RecordType,

    /// Owner name in dotted form, no trailing dot.
    pub name: String,

    /// Remaining lifetime in seconds.
    pub ttl: u32,

    /// Type-specific textual payload ("a.b.c.d" for A, "<pref> <exchange>"
    /// for MX, ...). Empty for types carried opaquely.
    pub data: Vec<String>,

    pub mx: Option<MxData>,
    pub soa: Option<SoaData>,
}

impl DnsRecord {
    pub fn new(record_type: RecordType, name: String, ttl: u32, data: Vec<String>) -> Self {
        Self {
            record_type,
            name,
            ttl,
            data,
            mx: None,
            soa: None,
        }
    }

    pub fn is_expired(&self, elapsed_secs: u64) -> bool {
        elapsed_secs >= u64::from(self.ttl)
    }

    pub fn remaining_ttl(&self, elapsed_secs: u64) -> u32 {
        u64::from(self.ttl)
            .saturating_sub(elapsed_secs)
            .min(u64::from(u32::MAX)) as u32
    }
}

impl PartialEq for DnsRecord {
    fn eq(&self, other: &Self) -> bool {
        self.record_type == other.record_type && self.name == other.name && self.data == other.data
    }
}

impl Eq for DnsRecord {}

impl Hash for DnsRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record_type.hash(state);
        self.name.hash(state);
        self.data.hash(state);
    }
}
