use super::name::encode_name;
use rdns_domain::{DnsError, RecordType};

/// Standard query, recursion desired.
const QUERY_FLAGS: u16 = 0x0100;
const CLASS_IN: u16 = 1;
const HEADER_LEN: usize = 12;

pub struct MessageBuilder;

impl MessageBuilder {
    pub fn build_query(domain: &str, record_type: RecordType) -> Result<Vec<u8>, DnsError> {
        Self::build_query_with_id(domain, record_type).map(|(_, bytes)| bytes)
    }

    pub fn build_query_with_id(
        domain: &str,
        record_type: RecordType,
    ) -> Result<(u16, Vec<u8>), DnsError> {
        let id = fastrand::u16(..);

        let mut buf = Vec::with_capacity(HEADER_LEN + domain.len() + 6);
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&QUERY_FLAGS.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
        buf.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
        buf.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
        buf.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT

        encode_name(&mut buf, domain)?;

        buf.extend_from_slice(&record_type.to_u16().to_be_bytes());
        buf.extend_from_slice(&CLASS_IN.to_be_bytes());

        Ok((id, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::codec::name::decode_name;

    #[test]
    fn test_build_query_layout() {
        let query = MessageBuilder::build_query("example.com", RecordType::A).unwrap();

        assert_eq!(query.len(), 29);
        assert_eq!(&query[2..4], &[0x01, 0x00]); // flags: RD
        assert_eq!(&query[4..6], &[0x00, 0x01]); // QDCOUNT = 1
        assert_eq!(&query[6..12], &[0x00; 6]); // remaining counts = 0
        assert_eq!(
            &query[12..25],
            &[
                0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00
            ]
        );
        assert_eq!(&query[25..29], &[0x00, 0x01, 0x00, 0x01]); // QTYPE=A, QCLASS=IN
    }

    #[test]
    fn test_build_query_with_id_matches_header() {
        let (id, query) = MessageBuilder::build_query_with_id("example.com", RecordType::MX).unwrap();
        assert_eq!(u16::from_be_bytes([query[0], query[1]]), id);
        let qtype = u16::from_be_bytes([query[query.len() - 4], query[query.len() - 3]]);
        assert_eq!(qtype, RecordType::MX.to_u16());
    }

    #[test]
    fn test_qname_round_trips_through_decoder() {
        let query = MessageBuilder::build_query("mail.example.org", RecordType::AAAA).unwrap();
        let mut pos = 12;
        let decoded = decode_name(&query, &mut pos).unwrap();
        assert_eq!(decoded, "mail.example.org");
        assert_eq!(pos, query.len() - 4);
    }

    #[test]
    fn test_label_too_long_rejected() {
        let domain = format!("{}.com", "a".repeat(64));
        assert!(matches!(
            MessageBuilder::build_query(&domain, RecordType::A),
            Err(DnsError::LabelTooLong(_))
        ));
    }
}
