//! Transports for reaching DNS servers.
//!
//! A [`Dialer`] opens a TCP connection either directly or through a
//! SOCKS5 proxy, then runs a framed DNS exchange over it. One connection
//! carries exactly one query.

pub mod tcp;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

use crate::identity::ProxyIdentity;

/// How a probe path opens connections.
#[derive(Debug, Clone)]
pub enum Dialer {
    /// Connect straight to the target.
    Direct { timeout: Duration },
    /// Tunnel through a SOCKS5 proxy, authenticating with `identity`.
    Socks5 {
        proxy: SocketAddr,
        identity: ProxyIdentity,
        timeout: Duration,
    },
}

impl Dialer {
    /// The proxy credentials this dialer authenticates with, if any.
    pub fn identity(&self) -> Option<&ProxyIdentity> {
        match self {
            Dialer::Direct { .. } => None,
            Dialer::Socks5 { identity, .. } => Some(identity),
        }
    }

    /// Send a DNS query to `server` over a fresh TCP connection.
    pub async fn exchange(&self, server: SocketAddr, query: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Dialer::Direct { timeout } => {
                let mut stream = within(*timeout, TcpStream::connect(server)).await?;
                tcp::exchange(&mut stream, query).await
            }
            Dialer::Socks5 {
                proxy,
                identity,
                timeout,
            } => {
                debug!(%proxy, %server, "dialing through SOCKS5");
                let connect = async {
                    Socks5Stream::connect_with_password(
                        *proxy,
                        server,
                        identity.username(),
                        identity.password(),
                    )
                    .await
                    .map_err(io::Error::other)
                };
                let mut stream = within(*timeout, connect).await?;
                tcp::exchange(&mut stream, query).await
            }
        }
    }
}

async fn within<T>(
    timeout: Duration,
    connect: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    tokio::time::timeout(timeout, connect).await.map_err(|_| {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("dial timed out after {timeout:?}"),
        )
    })?
}
