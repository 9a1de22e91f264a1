//! Faults that abort a run.
//!
//! Anything that goes wrong inside a single probe is recorded in that
//! probe's outcome instead. See [`crate::results::PathOutcome`].

use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid address {addr:?}: {source}")]
    Address {
        addr: String,
        source: AddrParseError,
    },
    #[error("failed to generate proxy credentials: {0}")]
    Random(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to read names from {}: {source}", path.display())]
    ReadNames { path: PathBuf, source: io::Error },
    #[error("results file {} is not writable: {source}", path.display())]
    WriteResults { path: PathBuf, source: io::Error },
    #[error("failed to encode results: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("work queue closed while names were pending")]
    QueueClosed,
}
