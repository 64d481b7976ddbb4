//! Append-only log of denied names.
//!
//! Each name appears at most once. The file survives restarts, so lines
//! written by earlier runs count towards deduplication.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::LogWriteError;

/// Deduplicated denial log backed by a text file.
pub struct DenialLog {
    path: PathBuf,
    /// Serializes the scan-then-append sequence.
    lock: Mutex<()>,
}

impl DenialLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a denied name. Failures are logged and otherwise ignored.
    pub async fn record(&self, domain: &str) {
        match self.try_record(domain).await {
            Ok(true) => debug!(domain, "logged denied domain"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, domain, "failed to log denied domain"),
        }
    }

    /// Append `domain` unless it is already present.
    ///
    /// Returns `true` when a new line was written.
    pub async fn try_record(&self, domain: &str) -> Result<bool, LogWriteError> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        let mut existing = String::new();
        file.read_to_string(&mut existing)
            .await
            .map_err(|e| self.write_error(e))?;

        if existing.lines().any(|line| line.trim() == domain) {
            return Ok(false);
        }

        let mut line = String::with_capacity(domain.len() + 2);
        if !existing.is_empty() && !existing.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(domain);
        line.push('\n');

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;

        Ok(true)
    }

    fn write_error(&self, source: std::io::Error) -> LogWriteError {
        LogWriteError {
            path: self.path.clone(),
            source,
        }
    }
}
