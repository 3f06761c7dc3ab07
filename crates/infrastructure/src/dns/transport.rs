//! One-shot UDP transport (RFC 1035 §4.2.1)
//!
//! Used for destinations the connection pool does not serve: NS-delegation
//! targets discovered mid-resolution and nameservers added after pool
//! construction.

use super::codec::{MessageBuilder, ResponseParser};
use rdns_domain::{DnsError, DnsRecord, RecordType};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Receive buffer size; responses larger than this require EDNS(0), which
/// is not negotiated.
pub(crate) const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub(crate) const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn query_oneshot(
    server: SocketAddr,
    domain: &str,
    record_type: RecordType,
) -> Result<Vec<DnsRecord>, DnsError> {
    let query = MessageBuilder::build_query(domain, record_type)?;

    let bind_addr: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| DnsError::Io(format!("Failed to bind UDP socket: {}", e)))?;

    let bytes_sent = socket
        .send_to(&query, server)
        .await
        .map_err(|e| DnsError::Io(format!("Failed to send query to {}: {}", server, e)))?;
    debug!(server = %server, bytes_sent, "One-shot UDP query sent");

    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    let (received, from_addr) = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| DnsError::RecvFailed(format!("timed out waiting for {}", server)))?
        .map_err(|e| DnsError::RecvFailed(format!("{}: {}", server, e)))?;

    if from_addr.ip() != server.ip() {
        warn!(
            expected = %server,
            received_from = %from_addr,
            "UDP response from unexpected source"
        );
    }

    if received == 0 {
        return Err(DnsError::RecvFailed(format!(
            "empty datagram from {}",
            server
        )));
    }

    buf.truncate(received);
    debug!(server = %server, bytes_received = received, "One-shot UDP response received");

    ResponseParser::parse(&buf)
}
