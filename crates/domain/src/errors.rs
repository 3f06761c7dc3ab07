use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Domain label exceeds 63 bytes: {0}")]
    LabelTooLong(String),

    #[error("Response too short: {0} bytes")]
    ShortResponse(usize),

    #[error("DNS server returned error code {0}")]
    ServerError(u8),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to receive response: {0}")]
    RecvFailed(String),

    #[error("No nameservers provided")]
    NoNameservers,

    #[error("Failed to create any valid connections")]
    NoValidConnections,

    #[error("Connection acquisition failed")]
    PoolAcquireFailed,

    #[error("Maximum recursion depth exceeded")]
    RecursionLimit,

    #[error("CNAME resolution failed")]
    CnameResolutionFailed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}
