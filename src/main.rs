use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dnsgate::proxy::{self, ProxyConfig};
use dnsgate::upstream::DEFAULT_UPSTREAM_URL;

#[derive(Parser)]
#[command(name = "dnsgate")]
#[command(version, about = "Whitelist-gated DNS relay", long_about = None)]
struct Args {
    /// Local port to listen on
    #[arg(short, long, env = "DNSGATE_PORT", default_value = "5353")]
    port: u16,

    /// Bind address
    #[arg(short, long, env = "DNSGATE_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Local records file (`<name> <address>` per line)
    #[arg(short, long, env = "DNSGATE_RECORDS", default_value = "dns_records.txt")]
    records: PathBuf,

    /// Whitelist file (one name or suffix per line)
    #[arg(short, long, env = "DNSGATE_WHITELIST", default_value = "whitelist.txt")]
    whitelist: PathBuf,

    /// Denied-name log file
    #[arg(short, long, env = "DNSGATE_DENIED_LOG", default_value = "denied.log")]
    denied_log: PathBuf,

    /// JSON resolution endpoint
    #[arg(short, long, env = "DNSGATE_UPSTREAM", default_value = DEFAULT_UPSTREAM_URL)]
    upstream: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "DNSGATE_UPSTREAM_TIMEOUT", default_value = "10")]
    upstream_timeout: u64,

    /// Seconds between stats lines (0 disables)
    #[arg(long, env = "DNSGATE_STATS_INTERVAL", default_value = "60")]
    stats_interval: u64,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    let config = ProxyConfig {
        bind_addr,
        records_path: args.records,
        whitelist_path: args.whitelist,
        denied_log_path: args.denied_log,
        upstream_url: args.upstream,
        upstream_timeout: Duration::from_secs(args.upstream_timeout),
        stats_interval: Duration::from_secs(args.stats_interval),
    };

    proxy::run(config).await.context("DNS relay failed")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(args))
}
