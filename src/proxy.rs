//! Relay orchestration.
//!
//! Loads the record store, binds the transport and runs the relay.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::denial::DenialLog;
use crate::error::Error;
use crate::filter::Whitelist;
use crate::records::RecordStore;
use crate::resolver::Resolver;
use crate::transport::udp::UdpTransport;
use crate::upstream::HttpResolver;

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:5353)
    pub bind_addr: SocketAddr,
    /// Local `<name> <address>` records, loaded once
    pub records_path: PathBuf,
    /// Names and suffixes that may be resolved upstream, re-read per check
    pub whitelist_path: PathBuf,
    /// Deduplicated log of denied names
    pub denied_log_path: PathBuf,
    /// JSON resolution endpoint
    pub upstream_url: String,
    /// Per-request deadline for the upstream
    pub upstream_timeout: Duration,
    /// How often to log stats; zero disables
    pub stats_interval: Duration,
}

/// Run the relay with the given configuration.
///
/// Fails before binding if the record store cannot be loaded. Otherwise
/// runs indefinitely.
pub async fn run(config: ProxyConfig) -> Result<(), Error> {
    let records = Arc::new(RecordStore::load(&config.records_path)?);
    let upstream = Arc::new(HttpResolver::new(
        config.upstream_url.clone(),
        config.upstream_timeout,
    )?);
    let resolver = Arc::new(Resolver::new(
        records,
        Whitelist::new(&config.whitelist_path),
        DenialLog::new(&config.denied_log_path),
        upstream,
    ));

    let udp = UdpTransport::bind(config.bind_addr)
        .await
        .map_err(|source| Error::Bind {
            addr: config.bind_addr,
            source,
        })?;

    info!(
        addr = %config.bind_addr,
        records = resolver.record_count(),
        whitelist = %config.whitelist_path.display(),
        denied_log = %config.denied_log_path.display(),
        upstream = %config.upstream_url,
        "DNS relay listening"
    );

    udp.start(resolver.clone());

    if !config.stats_interval.is_zero() {
        tokio::spawn(log_stats(resolver, config.stats_interval));
    }

    // Keep running forever
    std::future::pending::<()>().await;

    Ok(())
}

/// Log and reset the resolver stats every `period`.
async fn log_stats(resolver: Arc<Resolver>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        let stats = resolver.stats_snapshot_and_reset();
        info!(
            records = resolver.record_count(),
            requests = stats.requests,
            local = stats.local,
            forwarded = stats.forwarded,
            denied = stats.denied,
            failed = stats.failed,
            avg_response_ms = %format!("{:.2}", stats.avg_response_ms),
            "stats"
        );
    }
}
