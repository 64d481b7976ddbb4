//! Transport layer for the relay.
//!
//! Receives DNS queries from clients and hands them to the resolver.

pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;
