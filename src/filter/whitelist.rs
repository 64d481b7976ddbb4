//! Whitelist of domains that may be resolved upstream.
//!
//! The file is read again on every check so edits apply without a restart.
//! An unreadable file denies everything.

use std::path::PathBuf;

use tracing::warn;

use crate::error::WhitelistReadError;

/// File-backed whitelist.
pub struct Whitelist {
    path: PathBuf,
}

impl Whitelist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check whether `domain` may be resolved upstream.
    ///
    /// Reads the whitelist file from scratch. Read failures are logged and
    /// treated as "not permitted".
    pub async fn is_permitted(&self, domain: &str) -> bool {
        match self.read().await {
            Ok(contents) => matches(&contents, domain),
            Err(e) => {
                warn!(error = %e, domain, "whitelist unavailable, denying");
                false
            }
        }
    }

    async fn read(&self) -> Result<String, WhitelistReadError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| WhitelistReadError {
                path: self.path.clone(),
                source,
            })
    }
}

/// Match `domain` against whitelist file contents.
///
/// An entry matches when it equals `domain` or is a plain string suffix of it.
/// The suffix test does not look for a dot boundary, so `example.com` also
/// matches `notexample.com`.
pub fn matches(contents: &str, domain: &str) -> bool {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|entry| entry == domain || domain.ends_with(entry))
}
