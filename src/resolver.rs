//! DNS query resolution logic.
//!
//! Each question goes through the same ordered policy:
//! 1. Local record store (answer directly)
//! 2. Whitelist (deny and log the name if not permitted)
//! 3. External resolver (answer and cache the address)
//!
//! Transports handle the actual I/O, resolver handles decisions.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::denial::DenialLog;
use crate::dns::{DnsQuery, DnsQuestion, DnsRecord};
use crate::error::ResolveError;
use crate::filter::Whitelist;
use crate::records::RecordStore;
use crate::stats::{Stats, StatsSnapshot};
use crate::upstream::ExternalResolver;

/// Outcome for a single question.
#[derive(Debug)]
pub enum Resolution {
    /// Answered from the record store.
    Local(String),
    /// Resolved upstream and cached.
    External(String),
    /// Not whitelisted; the name went to the denial log.
    Denied,
    /// Upstream failed; nothing was cached.
    Failed(ResolveError),
    /// Not an address question.
    Unsupported,
}

impl Resolution {
    pub fn address(&self) -> Option<&str> {
        match self {
            Resolution::Local(address) | Resolution::External(address) => Some(address),
            _ => None,
        }
    }
}

/// Resolver handles DNS query processing decisions.
///
/// Owns the policy sources and is shared between transport tasks.
pub struct Resolver {
    records: Arc<RecordStore>,
    whitelist: Whitelist,
    denials: DenialLog,
    upstream: Arc<dyn ExternalResolver>,
    stats: Stats,
}

impl Resolver {
    pub fn new(
        records: Arc<RecordStore>,
        whitelist: Whitelist,
        denials: DenialLog,
        upstream: Arc<dyn ExternalResolver>,
    ) -> Self {
        Self {
            records,
            whitelist,
            denials,
            upstream,
            stats: Stats::new(),
        }
    }

    /// Process a raw DNS query and build the reply.
    ///
    /// Questions are resolved concurrently and answered in question order.
    /// The reply is authoritative and may carry no answers at all. Returns
    /// `None` for datagrams that are not decodable queries.
    pub async fn handle_query(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let start_time = Instant::now();

        let Some(query) = DnsQuery::parse(packet) else {
            debug!(len = packet.len(), "dropping undecodable datagram");
            return None;
        };
        if !query.is_query() {
            debug!(id = query.id, "dropping non-query message");
            return None;
        }

        let mut reply = query.reply();
        let answers = join_all(query.questions.iter().map(|q| self.answer(q))).await;
        reply.answers = answers.into_iter().flatten().collect();

        self.stats
            .record_request(start_time.elapsed().as_secs_f64() * 1000.0);

        Some(reply.to_bytes())
    }

    /// Resolve one question into at most one answer record.
    async fn answer(&self, question: &DnsQuestion) -> Option<DnsRecord> {
        let domain = question.domain.to_lowercase();
        let resolution = if question.wants_address() {
            self.resolve(&domain).await
        } else {
            debug!(%domain, qtype = question.qtype, "unsupported question type");
            Resolution::Unsupported
        };
        let address = resolution.address()?;

        match DnsRecord::a(&domain, address) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, %domain, "failed to build answer");
                None
            }
        }
    }

    /// Run the resolution policy for an already lowercased name.
    pub async fn resolve(&self, domain: &str) -> Resolution {
        if let Some(address) = self.records.lookup(domain) {
            debug!(domain, %address, "LOCAL");
            self.stats.record_local();
            return Resolution::Local(address);
        }

        if !self.whitelist.is_permitted(domain).await {
            debug!(domain, "DENIED");
            self.denials.record(domain).await;
            self.stats.record_denied();
            return Resolution::Denied;
        }

        let upstream_start = Instant::now();
        match self.upstream.resolve(domain).await {
            Ok(address) => {
                debug!(
                    domain,
                    %address,
                    upstream_ms = upstream_start.elapsed().as_secs_f64() * 1000.0,
                    "FORWARDED"
                );
                self.records.insert(domain.to_string(), address.clone());
                self.stats.record_forwarded();
                Resolution::External(address)
            }
            Err(e) => {
                warn!(error = %e, domain, "external resolution failed");
                self.stats.record_failed();
                Resolution::Failed(e)
            }
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Returns the number of entries in the record store.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}
