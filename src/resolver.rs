//! Name resolution for probes.
//!
//! A probe asks its resolver for a single IPv4 address:
//! 1. Build an A query with EDNS0
//! 2. Send it over TCP through the path's dialer
//! 3. Take the first A record of the answer section
//!
//! No retries happen at any step.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::dns::{CodecError, DnsQuery, DnsResponse};
use crate::transport::Dialer;

/// Why a lookup produced no address.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("DNS lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid name: {0}")]
    InvalidName(#[source] CodecError),
    #[error("invalid DNS response: {0}")]
    InvalidResponse(#[source] CodecError),
    #[error("DNS response ID mismatch")]
    IdMismatch,
    #[error("no addresses found")]
    NoAddresses,
    #[error("malformed response")]
    Malformed,
}

/// Resolves a name to one IPv4 address.
pub trait Resolve: Send + Sync + 'static {
    fn lookup_ipv4(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Ipv4Addr, ResolveError>> + Send;
}

/// Resolver that queries one DNS server over TCP.
///
/// Holds no per-lookup state, so a single instance can serve many
/// concurrent probes.
#[derive(Debug, Clone)]
pub struct DnsResolver {
    server: SocketAddr,
    dialer: Dialer,
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(server: SocketAddr, dialer: Dialer, timeout: Duration) -> Self {
        Self {
            server,
            dialer,
            timeout,
        }
    }

    pub fn dialer(&self) -> &Dialer {
        &self.dialer
    }
}

impl Resolve for DnsResolver {
    async fn lookup_ipv4(&self, name: &str) -> Result<Ipv4Addr, ResolveError> {
        let query = DnsQuery::a_record(name, rand::random());
        let packet = query.to_bytes().map_err(ResolveError::InvalidName)?;

        let reply = tokio::time::timeout(self.timeout, self.dialer.exchange(self.server, &packet))
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))??;

        let response = DnsResponse::parse(&reply).map_err(ResolveError::InvalidResponse)?;
        if response.id != query.id {
            return Err(ResolveError::IdMismatch);
        }
        if response.answers.is_empty() {
            return Err(ResolveError::NoAddresses);
        }

        response.first_ipv4().ok_or(ResolveError::Malformed)
    }
}
