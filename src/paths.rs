//! Construction of the two probe paths.
//!
//! The plain path is built once and shared by every worker. The tor path
//! is rebuilt for every probe around a new [`ProxyIdentity`], so no two
//! probes share proxy credentials, connections or client state.

use std::sync::Arc;

use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::SetupError;
use crate::http::{Fetch, HttpFetcher};
use crate::identity::ProxyIdentity;
use crate::resolver::{DnsResolver, Resolve};
use crate::transport::Dialer;

/// One resolver and one fetcher that route the same way.
#[derive(Debug)]
pub struct Path<R, F> {
    pub resolver: R,
    pub fetcher: F,
}

/// Source of probe paths for the tester.
pub trait PathFactory: Send + Sync + 'static {
    type Resolver: Resolve;
    type Fetcher: Fetch;

    /// The shared direct path.
    fn plain(&self) -> Arc<Path<Self::Resolver, Self::Fetcher>>;

    /// A new anonymized path, used for exactly one probe.
    fn isolated(&self) -> Result<Path<Self::Resolver, Self::Fetcher>, SetupError>;
}

/// Paths over the real network: direct, and through the SOCKS5 proxy.
pub struct NetworkPaths {
    config: ProbeConfig,
    plain: Arc<Path<DnsResolver, HttpFetcher>>,
}

impl NetworkPaths {
    /// Build the plain path and check that an isolated path can be built,
    /// so configuration faults surface before probing starts.
    pub fn new(config: ProbeConfig) -> Result<Self, SetupError> {
        let plain = Path {
            resolver: DnsResolver::new(
                config.dns_addr,
                Dialer::Direct {
                    timeout: config.dial_timeout,
                },
                config.timeout,
            ),
            fetcher: HttpFetcher::direct(config.http_port, config.timeout)?,
        };

        let paths = Self {
            config,
            plain: Arc::new(plain),
        };
        paths.isolated()?;

        Ok(paths)
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

impl PathFactory for NetworkPaths {
    type Resolver = DnsResolver;
    type Fetcher = HttpFetcher;

    fn plain(&self) -> Arc<Path<DnsResolver, HttpFetcher>> {
        Arc::clone(&self.plain)
    }

    fn isolated(&self) -> Result<Path<DnsResolver, HttpFetcher>, SetupError> {
        let identity = ProxyIdentity::generate()?;
        debug!(proxy = %self.config.proxy_addr, "new proxy identity");

        let fetcher = HttpFetcher::through_proxy(
            self.config.proxy_addr,
            &identity,
            self.config.http_port,
            self.config.timeout,
            self.config.dial_timeout,
        )?;
        let resolver = DnsResolver::new(
            self.config.dns_addr,
            Dialer::Socks5 {
                proxy: self.config.proxy_addr,
                identity,
                timeout: self.config.dial_timeout,
            },
            self.config.timeout,
        );

        Ok(Path { resolver, fetcher })
    }
}
