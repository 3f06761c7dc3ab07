//! Bounded pool of pre-connected UDP endpoints to upstream nameservers.
//!
//! The pool is keyed by destination: `acquire` hands out an endpoint whose
//! socket is connected to the requested nameserver, so a query can never be
//! sent to a different upstream than the caller named. Ownership of the
//! endpoint moves to the caller for the duration of the guard; dropping the
//! guard returns a healthy endpoint to its queue and wakes waiters, while
//! an endpoint that hit an unrecoverable I/O error is retired.

use super::codec::{MessageBuilder, ResponseParser};
use super::transport::{MAX_UDP_RESPONSE_SIZE, RECV_TIMEOUT};
use rdns_domain::{DnsError, DnsRecord, RecordType};
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

struct UdpEndpoint {
    server: SocketAddr,
    socket: Arc<UdpSocket>,
    valid: bool,
}

pub struct ConnectionPool {
    ready: Mutex<HashMap<SocketAddr, VecDeque<UdpEndpoint>>>,
    released: Notify,
}

impl ConnectionPool {
    /// Builds up to `pool_size` endpoints, assigning destinations
    /// round-robin over `servers`. Endpoints that fail to construct are
    /// skipped with a warning; construction fails only when `servers` is
    /// empty (`NoNameservers`) or no endpoint at all could be built
    /// (`NoValidConnections`).
    pub async fn new(pool_size: usize, servers: &[SocketAddr]) -> Result<Self, DnsError> {
        if servers.is_empty() {
            return Err(DnsError::NoNameservers);
        }

        let mut ready: HashMap<SocketAddr, VecDeque<UdpEndpoint>> = HashMap::new();
        for slot in 0..pool_size {
            let server = servers[slot % servers.len()];
            match Self::connect_endpoint(server).await {
                Ok(endpoint) => ready.entry(server).or_default().push_back(endpoint),
                Err(error) => {
                    warn!(server = %server, error = %error, "Failed to construct pool endpoint");
                }
            }
        }

        let endpoints: usize = ready.values().map(VecDeque::len).sum();
        if endpoints == 0 {
            return Err(DnsError::NoValidConnections);
        }

        info!(
            endpoints,
            servers = ready.len(),
            "UDP connection pool initialized"
        );

        Ok(Self {
            ready: Mutex::new(ready),
            released: Notify::new(),
        })
    }

    async fn connect_endpoint(server: SocketAddr) -> Result<UdpEndpoint, DnsError> {
        use socket2::{Domain, Protocol, Socket, Type};

        let domain = if server.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_recv_buffer_size(256 * 1024)?;
        socket.set_send_buffer_size(128 * 1024)?;

        let bind_addr: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        socket.bind(&bind_addr.into())?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        socket.connect(server).await?;

        Ok(UdpEndpoint {
            server,
            socket: Arc::new(socket),
            valid: true,
        })
    }

    /// Whether the pool was constructed with endpoints for `server`.
    pub fn serves(&self, server: &SocketAddr) -> bool {
        self.lock().contains_key(server)
    }

    /// Total endpoints currently checked in.
    pub fn available(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    pub fn available_for(&self, server: &SocketAddr) -> usize {
        self.lock().get(server).map_or(0, VecDeque::len)
    }

    /// Takes an endpoint connected to `server`, waiting until one is
    /// checked in. There is no timeout here; callers bound the wait with
    /// their per-attempt budget. `PoolAcquireFailed` means the pool never
    /// had endpoints for `server`.
    pub async fn acquire(&self, server: SocketAddr) -> Result<PooledConnection<'_>, DnsError> {
        if !self.serves(&server) {
            return Err(DnsError::PoolAcquireFailed);
        }

        loop {
            // Register for wakeups before checking the queue so a release
            // between the check and the await is not missed.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if let Some(endpoint) = self.try_pop(&server) {
                debug!(server = %server, "Acquired pooled endpoint");
                return Ok(PooledConnection {
                    server: endpoint.server,
                    socket: endpoint.socket,
                    valid: endpoint.valid,
                    pool: self,
                });
            }

            released.await;
        }
    }

    fn try_pop(&self, server: &SocketAddr) -> Option<UdpEndpoint> {
        self.lock().get_mut(server)?.pop_front()
    }

    fn give_back(&self, endpoint: UdpEndpoint) {
        if !endpoint.valid {
            debug!(server = %endpoint.server, "Retiring invalid endpoint");
            // Wake waiters so nobody sleeps on a queue that just shrank.
            self.released.notify_waiters();
            return;
        }

        let server = endpoint.server;
        self.lock().entry(server).or_default().push_back(endpoint);
        self.released.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, VecDeque<UdpEndpoint>>> {
        self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive handle on one pooled endpoint. Dropping the guard checks the
/// endpoint back in (or retires it if an I/O error marked it invalid).
pub struct PooledConnection<'a> {
    server: SocketAddr,
    socket: Arc<UdpSocket>,
    valid: bool,
    pool: &'a ConnectionPool,
}

impl PooledConnection<'_> {
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Builds a query datagram and sends it to the bound destination.
    pub async fn send_query(
        &mut self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<(), DnsError> {
        let query = MessageBuilder::build_query(domain, record_type)?;

        match self.socket.send(&query).await {
            Ok(bytes_sent) => {
                debug!(server = %self.server, bytes_sent, "DNS query sent");
                Ok(())
            }
            Err(error) => {
                self.valid = false;
                Err(DnsError::Io(format!(
                    "Failed to send query to {}: {}",
                    self.server, error
                )))
            }
        }
    }

    /// Receives one response datagram (4096-byte buffer, 5-second timeout)
    /// and parses it. A timeout leaves the endpoint healthy; a socket error
    /// retires it.
    pub async fn receive(&mut self) -> Result<Vec<DnsRecord>, DnsError> {
        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];

        let received = match tokio::time::timeout(RECV_TIMEOUT, self.socket.recv(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(error)) => {
                self.valid = false;
                return Err(DnsError::RecvFailed(format!("{}: {}", self.server, error)));
            }
            Err(_) => {
                return Err(DnsError::RecvFailed(format!(
                    "timed out waiting for {}",
                    self.server
                )));
            }
        };

        if received == 0 {
            return Err(DnsError::RecvFailed(format!(
                "empty datagram from {}",
                self.server
            )));
        }

        buf.truncate(received);
        debug!(server = %self.server, bytes_received = received, "DNS response received");

        ResponseParser::parse(&buf)
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool.give_back(UdpEndpoint {
            server: self.server,
            socket: Arc::clone(&self.socket),
            valid: self.valid,
        });
    }
}
