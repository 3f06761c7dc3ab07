#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// One scripted answer. The owner name is always emitted as a compression
/// pointer to the question name at offset 12.
#[derive(Debug, Clone)]
pub struct Answer {
    pub type_code: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl Answer {
    pub fn a(ttl: u32, octets: [u8; 4]) -> Self {
        Self {
            type_code: 1,
            ttl,
            rdata: octets.to_vec(),
        }
    }

    pub fn aaaa(ttl: u32, octets: [u8; 16]) -> Self {
        Self {
            type_code: 28,
            ttl,
            rdata: octets.to_vec(),
        }
    }

    pub fn cname(ttl: u32, target: &str) -> Self {
        Self {
            type_code: 5,
            ttl,
            rdata: encode_name_bytes(target),
        }
    }

    pub fn ns(ttl: u32, target: &str) -> Self {
        Self {
            type_code: 2,
            ttl,
            rdata: encode_name_bytes(target),
        }
    }

    pub fn mx(ttl: u32, preference: u16, exchange: &str) -> Self {
        let mut rdata = preference.to_be_bytes().to_vec();
        rdata.extend_from_slice(&encode_name_bytes(exchange));
        Self {
            type_code: 15,
            ttl,
            rdata,
        }
    }

    pub fn txt(ttl: u32, strings: &[&str]) -> Self {
        let mut rdata = Vec::new();
        for s in strings {
            rdata.push(s.len() as u8);
            rdata.extend_from_slice(s.as_bytes());
        }
        Self {
            type_code: 16,
            ttl,
            rdata,
        }
    }

    pub fn soa(ttl: u32, mname: &str, rname: &str, counters: [u32; 5]) -> Self {
        let mut rdata = encode_name_bytes(mname);
        rdata.extend_from_slice(&encode_name_bytes(rname));
        for value in counters {
            rdata.extend_from_slice(&value.to_be_bytes());
        }
        Self {
            type_code: 6,
            ttl,
            rdata,
        }
    }

    pub fn raw(type_code: u16, ttl: u32, rdata: Vec<u8>) -> Self {
        Self {
            type_code,
            ttl,
            rdata,
        }
    }
}

/// Installs a fmt subscriber honoring `RUST_LOG`; safe to call from every
/// test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Uncompressed wire form of a domain name.
pub fn encode_name_bytes(domain: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in domain.split('.').filter(|label| !label.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Builds a response to `query`: same id, response flags with `rcode`,
/// the question echoed verbatim, and each answer named by a pointer to
/// the question at offset 12.
pub fn build_response(query: &[u8], rcode: u8, answers: &[Answer]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&query[0..2]);
    let flags: u16 = 0x8180 | u16::from(rcode);
    out.extend_from_slice(&flags.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&query[12..]);

    for answer in answers {
        out.extend_from_slice(&[0xC0, 0x0C]);
        out.extend_from_slice(&answer.type_code.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&answer.ttl.to_be_bytes());
        out.extend_from_slice(&(answer.rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&answer.rdata);
    }

    out
}

/// Question name and type of a query datagram.
pub fn decode_question(query: &[u8]) -> (String, u16) {
    let mut pos = 12;
    let mut name = String::new();
    loop {
        let len = query[pos] as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(std::str::from_utf8(&query[pos..pos + len]).unwrap());
        pos += len;
    }
    let qtype = u16::from_be_bytes([query[pos], query[pos + 1]]);
    (name, qtype)
}

/// A scripted UDP nameserver on loopback. The script maps (qname, qtype)
/// to (rcode, answers); queries it declines get NXDOMAIN.
pub struct FakeNameserver {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl FakeNameserver {
    pub async fn spawn<S>(script: S) -> Self
    where
        S: Fn(&str, u16) -> Option<(u8, Vec<Answer>)> + Send + Sync + 'static,
    {
        Self::spawn_on(IpAddr::from([127, 0, 0, 1]), 0, script).await
    }

    pub async fn spawn_on<S>(ip: IpAddr, port: u16, script: S) -> Self
    where
        S: Fn(&str, u16) -> Option<(u8, Vec<Answer>)> + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind(SocketAddr::new(ip, port)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let script = Arc::new(script);

        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((received, peer)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let query = &buf[..received];
                let (qname, qtype) = decode_question(query);
                let response = match script(&qname, qtype) {
                    Some((rcode, answers)) => build_response(query, rcode, &answers),
                    None => build_response(query, 3, &[]),
                };
                let _ = socket.send_to(&response, peer).await;
            }
        });

        Self { addr, handle }
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for FakeNameserver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
