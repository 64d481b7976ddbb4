//! DNS query filtering module.
//!
//! Decides which names that are not known locally may be resolved upstream.

pub mod whitelist;

pub use whitelist::Whitelist;
