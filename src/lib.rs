//! dnsgate - a whitelist-gated DNS relay.
//!
//! Answers queries from a local record file and forwards whitelisted misses
//! to a JSON resolution service, logging every denied name once.

pub mod denial;
pub mod dns;
pub mod error;
pub mod filter;
pub mod proxy;
pub mod records;
pub mod resolver;
pub mod stats;
pub mod transport;
pub mod upstream;
