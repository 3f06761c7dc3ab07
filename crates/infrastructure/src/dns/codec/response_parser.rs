use super::name::{decode_name, truncated};
use rdns_domain::{DnsError, DnsRecord, MxData, RecordType, SoaData};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, trace};

const HEADER_LEN: usize = 12;
const RCODE_MASK: u16 = 0x000F;

/// Parses raw DNS wire-format responses into answer records.
///
/// Only the answer section is decoded; authority and additional sections
/// are ignored. The cursor advances by RDLENGTH after every answer, so a
/// record type with no rdata decoding never desynchronizes the parse.
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response: &[u8]) -> Result<Vec<DnsRecord>, DnsError> {
        if response.len() < HEADER_LEN {
            return Err(DnsError::ShortResponse(response.len()));
        }

        let mut pos = 0usize;
        let _id = read_u16(response, &mut pos)?;
        let flags = read_u16(response, &mut pos)?;
        let qdcount = read_u16(response, &mut pos)?;
        let ancount = read_u16(response, &mut pos)?;
        let _nscount = read_u16(response, &mut pos)?;
        let _arcount = read_u16(response, &mut pos)?;

        let rcode = (flags & RCODE_MASK) as u8;
        if rcode != 0 {
            return Err(DnsError::ServerError(rcode));
        }

        for _ in 0..qdcount {
            decode_name(response, &mut pos)?;
            skip(response, &mut pos, 4)?; // QTYPE + QCLASS
        }

        let mut records = Vec::with_capacity(usize::from(ancount));
        for _ in 0..ancount {
            let name = decode_name(response, &mut pos)?;
            let type_code = read_u16(response, &mut pos)?;
            let _class = read_u16(response, &mut pos)?;
            let ttl = read_u32(response, &mut pos)?;
            let rdlength = usize::from(read_u16(response, &mut pos)?);

            let rdata_end = pos + rdlength;
            if rdata_end > response.len() {
                return Err(truncated("rdata", rdata_end));
            }

            if let Some(record_type) = RecordType::from_u16(type_code) {
                records.push(Self::parse_rdata(
                    response,
                    pos,
                    rdlength,
                    record_type,
                    name,
                    ttl,
                )?);
            } else {
                trace!(type_code, name = %name, "Skipping answer with unrecognized type");
            }

            pos = rdata_end;
        }

        debug!(answers = records.len(), "DNS response parsed");
        Ok(records)
    }

    fn parse_rdata(
        message: &[u8],
        rdata_start: usize,
        rdlength: usize,
        record_type: RecordType,
        name: String,
        ttl: u32,
    ) -> Result<DnsRecord, DnsError> {
        let mut record = DnsRecord::new(record_type, name, ttl, Vec::new());
        let mut pos = rdata_start;
        let rdata_end = rdata_start + rdlength;

        match record_type {
            RecordType::A => {
                if rdlength != 4 {
                    return Err(DnsError::MalformedResponse(format!(
                        "A rdata length {} (expected 4)",
                        rdlength
                    )));
                }
                let bytes = take(message, &mut pos, 4)?;
                let addr = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
                record.data.push(addr.to_string());
            }
            RecordType::AAAA => {
                if rdlength != 16 {
                    return Err(DnsError::MalformedResponse(format!(
                        "AAAA rdata length {} (expected 16)",
                        rdlength
                    )));
                }
                let bytes = take(message, &mut pos, 16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                record.data.push(Ipv6Addr::from(octets).to_string());
            }
            RecordType::CNAME | RecordType::NS | RecordType::PTR => {
                record.data.push(decode_name(message, &mut pos)?);
            }
            RecordType::MX => {
                let preference = read_u16(message, &mut pos)?;
                let exchange = decode_name(message, &mut pos)?;
                record.data.push(format!("{} {}", preference, exchange));
                record.mx = Some(MxData {
                    preference,
                    exchange,
                });
            }
            RecordType::TXT => {
                // One or more <character-string>s; concatenated until
                // RDLENGTH bytes are consumed.
                let mut text = String::new();
                while pos < rdata_end {
                    let len = usize::from(*message.get(pos).ok_or_else(|| truncated("TXT", pos))?);
                    pos += 1;
                    let end = pos + len;
                    if end > rdata_end {
                        return Err(truncated("TXT character-string", end));
                    }
                    text.push_str(&String::from_utf8_lossy(&message[pos..end]));
                    pos = end;
                }
                record.data.push(text);
            }
            RecordType::SOA => {
                let mname = decode_name(message, &mut pos)?;
                let rname = decode_name(message, &mut pos)?;
                let serial = read_u32(message, &mut pos)?;
                let refresh = read_u32(message, &mut pos)?;
                let retry = read_u32(message, &mut pos)?;
                let expire = read_u32(message, &mut pos)?;
                let minimum = read_u32(message, &mut pos)?;
                record.data.push(format!(
                    "{} {} {} {} {} {} {}",
                    mname, rname, serial, refresh, retry, expire, minimum
                ));
                record.soa = Some(SoaData {
                    mname,
                    rname,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                });
            }
            // Recognized but carried opaquely; `data` stays empty.
            RecordType::SRV | RecordType::RRSIG | RecordType::NSEC | RecordType::DNSKEY => {}
        }

        Ok(record)
    }
}

fn read_u16(buf: &[u8], pos: &mut usize) -> Result<u16, DnsError> {
    let bytes = buf
        .get(*pos..*pos + 2)
        .ok_or_else(|| truncated("u16", *pos))?;
    *pos += 2;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32, DnsError> {
    let bytes = buf
        .get(*pos..*pos + 4)
        .ok_or_else(|| truncated("u32", *pos))?;
    *pos += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn skip(buf: &[u8], pos: &mut usize, count: usize) -> Result<(), DnsError> {
    let end = *pos + count;
    if end > buf.len() {
        return Err(truncated("skip", end));
    }
    *pos = end;
    Ok(())
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, count: usize) -> Result<&'a [u8], DnsError> {
    let end = *pos + count;
    let bytes = buf.get(*pos..end).ok_or_else(|| truncated("rdata", end))?;
    *pos = end;
    Ok(bytes)
}
