//! Domain name encoding and decoding (RFC 1035 §3.1 / §4.1.4)
//!
//! Names are sequences of length-prefixed labels terminated by a zero
//! byte. In responses a label position may instead hold a two-byte
//! compression pointer (top bits `11`, low 14 bits an absolute offset into
//! the message) where decoding continues.

use rdns_domain::DnsError;

/// Maximum label length per RFC 1035 §2.3.4.
pub const MAX_LABEL_LEN: usize = 63;

const POINTER_MASK: u8 = 0xC0;

/// Upper bound on pointer hops per name. Valid messages need at most a
/// handful; anything past this is a pointer loop.
const MAX_POINTER_JUMPS: usize = 32;

/// Appends `domain` to `buf` as length-prefixed labels plus terminator.
///
/// Empty labels (a trailing dot, say) are skipped; a label longer than 63
/// bytes fails with `LabelTooLong`.
pub fn encode_name(buf: &mut Vec<u8>, domain: &str) -> Result<(), DnsError> {
    if domain.is_empty() {
        return Err(DnsError::InvalidDomainName("empty domain".into()));
    }

    for label in domain.split('.').filter(|label| !label.is_empty()) {
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::LabelTooLong(label.to_string()));
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }

    buf.push(0);
    Ok(())
}

/// Decodes the name at `*pos`, following compression pointers.
///
/// On return `*pos` sits on the byte after the name: after the terminator
/// when no pointer was followed, or after the first pointer's two bytes
/// otherwise. Labels are joined with '.'; no trailing dot.
pub fn decode_name(message: &[u8], pos: &mut usize) -> Result<String, DnsError> {
    let mut name = String::new();
    let mut cursor = *pos;
    let mut resume_at: Option<usize> = None;
    let mut jumps = 0usize;

    loop {
        let len = *message
            .get(cursor)
            .ok_or_else(|| truncated("name", cursor))?;

        if len & POINTER_MASK == POINTER_MASK {
            let low = *message
                .get(cursor + 1)
                .ok_or_else(|| truncated("compression pointer", cursor + 1))?;
            if resume_at.is_none() {
                resume_at = Some(cursor + 2);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(DnsError::MalformedResponse(
                    "compression pointer loop".into(),
                ));
            }
            cursor = (usize::from(len & 0x3F) << 8) | usize::from(low);
        } else if len == 0 {
            cursor += 1;
            break;
        } else {
            let start = cursor + 1;
            let end = start + usize::from(len);
            let label = message
                .get(start..end)
                .ok_or_else(|| truncated("label", end))?;
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(&String::from_utf8_lossy(label));
            cursor = end;
        }
    }

    *pos = resume_at.unwrap_or(cursor);
    Ok(name)
}

pub(crate) fn truncated(what: &str, at: usize) -> DnsError {
    DnsError::MalformedResponse(format!("truncated {} at byte {}", what, at))
}
