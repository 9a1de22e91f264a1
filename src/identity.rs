//! Per-probe proxy credentials.
//!
//! Tor isolates streams that authenticate to its SOCKS port with
//! different credentials onto different circuits. Every anonymized probe
//! gets its own random credential pair and drops it when the probe ends.

use std::net::SocketAddr;

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::SetupError;

const CREDENTIAL_BYTES: usize = 16;

/// A random SOCKS5 username/password pair. Both halves are the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    token: String,
}

impl ProxyIdentity {
    /// Draw a fresh identity from the operating system RNG.
    pub fn generate() -> Result<Self, SetupError> {
        let mut bytes = [0u8; CREDENTIAL_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SetupError::Random(e.to_string()))?;

        Ok(Self {
            token: hex::encode_upper(bytes),
        })
    }

    pub fn username(&self) -> &str {
        &self.token
    }

    pub fn password(&self) -> &str {
        &self.token
    }

    /// Proxy URL for an HTTP client, with the credentials embedded.
    pub fn proxy_url(&self, proxy: SocketAddr) -> String {
        format!("socks5://{}:{}@{}", self.username(), self.password(), proxy)
    }
}
