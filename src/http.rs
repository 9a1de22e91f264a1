//! HTTP fetching for probes.
//!
//! The request goes to the resolved address, not the name, and carries
//! the name in its Host header so virtual hosting still selects the site.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::header::HOST;
use reqwest::{Client, Proxy, Response};
use thiserror::Error;

use crate::error::SetupError;
use crate::identity::ProxyIdentity;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Issues `GET /` against an address on behalf of a name.
pub trait Fetch: Send + Sync + 'static {
    type Response: Page;

    /// Send the request and wait for the response head.
    fn fetch(
        &self,
        ip: Ipv4Addr,
        host: &str,
    ) -> impl Future<Output = Result<Self::Response, FetchError>> + Send;
}

/// A response whose body has not been read yet.
pub trait Page: Send {
    fn read_page(self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetcher backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    port: u16,
}

impl HttpFetcher {
    /// Fetcher for the plain path. Proxy settings from the environment
    /// are ignored.
    pub fn direct(port: u16, timeout: Duration) -> Result<Self, SetupError> {
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(SetupError::Client)?;

        Ok(Self { client, port })
    }

    /// Fetcher that tunnels every connection through `proxy` as `identity`.
    ///
    /// Idle connections are not pooled; the client is meant to serve a
    /// single probe and be dropped with it.
    pub fn through_proxy(
        proxy: SocketAddr,
        identity: &ProxyIdentity,
        port: u16,
        timeout: Duration,
        dial_timeout: Duration,
    ) -> Result<Self, SetupError> {
        let proxy = Proxy::all(identity.proxy_url(proxy)).map_err(SetupError::Client)?;
        let client = Client::builder()
            .proxy(proxy)
            .timeout(timeout)
            .connect_timeout(dial_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(SetupError::Client)?;

        Ok(Self { client, port })
    }
}

impl Fetch for HttpFetcher {
    type Response = Response;

    async fn fetch(&self, ip: Ipv4Addr, host: &str) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(format!("http://{}:{}/", ip, self.port))
            .header(HOST, host)
            .send()
            .await?;

        Ok(response)
    }
}

impl Page for Response {
    async fn read_page(self) -> Result<String, FetchError> {
        Ok(self.text().await?)
    }
}
