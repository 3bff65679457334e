//! Target Resolver - allowlist matching and host authorization
//!
//! Decides whether a requested host may be probed at all:
//! - [`classifier`]: pure matching of one address against one allowlist rule
//! - [`authorizer`]: strips stray `:port` suffixes, resolves hostnames and
//!   applies every rule to every candidate address, failing closed
//! - [`dns`]: the `trust-dns-resolver` backed [`HostResolver`] used in production
//!
//! [`HostResolver`]: portgate_common::HostResolver

pub mod authorizer;
pub mod classifier;
pub mod dns;

pub use authorizer::{Authorization, DenyReason, HostAuthorizer};
pub use classifier::{host_rule_matches, ip_matches, rule_matches, strip_port};
pub use dns::DnsResolver;
