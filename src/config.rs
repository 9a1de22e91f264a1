//! Probe configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::SetupError;

pub const DEFAULT_DNS_ADDR: &str = "8.8.8.8:53";
/// Tor Browser's SOCKS port.
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:9150";
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every probe of a run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Public resolver queried by both paths.
    pub dns_addr: SocketAddr,
    /// SOCKS5 endpoint of the anonymity network.
    pub proxy_addr: SocketAddr,
    /// Port the HTTP probe connects to on the resolved address.
    pub http_port: u16,
    /// Limit on a DNS exchange and on an HTTP request.
    pub timeout: Duration,
    /// Limit on opening a connection.
    pub dial_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dns_addr: SocketAddr::from(([8, 8, 8, 8], 53)),
            proxy_addr: SocketAddr::from(([127, 0, 0, 1], 9150)),
            http_port: DEFAULT_HTTP_PORT,
            timeout: DEFAULT_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

/// Parse a `host:port` socket address.
pub fn parse_addr(addr: &str) -> Result<SocketAddr, SetupError> {
    addr.parse().map_err(|source| SetupError::Address {
        addr: addr.to_string(),
        source,
    })
}
