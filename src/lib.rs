//! Block tester - compare how names resolve and serve directly and over Tor.
//!
//! For every name two probes run side by side: a plain probe over the
//! ordinary network path and a tor probe through a SOCKS5 proxy with a
//! fresh identity. Each probe resolves the name, fetches `/` from the
//! resulting address, and records what happened.

pub mod config;
pub mod dns;
pub mod error;
pub mod files;
pub mod http;
pub mod identity;
pub mod paths;
pub mod probe;
pub mod resolver;
pub mod results;
pub mod stats;
pub mod tester;
pub mod transport;

#[cfg(test)]
mod testutil;
