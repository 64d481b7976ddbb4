//! Error types.
//!
//! Only [`LoadError`] and the startup [`Error`] ever stop the process. The
//! rest are contained to the question that raised them.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Startup failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] ResolveError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// The local record source could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read records from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed record on line {line_number}: {line:?}")]
    MalformedRecord { line_number: usize, line: String },
}

#[derive(Debug, Error)]
#[error("failed to read whitelist {}: {source}", path.display())]
pub struct WhitelistReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// External resolution failed for one name.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("failed to parse upstream response: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("upstream query failed with status {0}")]
    UpstreamStatus(i64),

    #[error("no answer from upstream")]
    NoAnswer,
}

/// An answer record could not be built.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{address:?} is not an IPv4 address (for {name})")]
    InvalidAddress { name: String, address: String },

    #[error("label longer than 63 bytes in {0}")]
    LabelTooLong(String),
}

#[derive(Debug, Error)]
#[error("failed to update denial log {}: {source}", path.display())]
pub struct LogWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
