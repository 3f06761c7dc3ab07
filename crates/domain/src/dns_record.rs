mod record;
mod record_type;

pub use record::{DnsRecord, MxData, SoaData};
pub use record_type::RecordType;
