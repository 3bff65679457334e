//! Host authorization against the allowlist
//!
//! A host is allowed when any of its candidate addresses satisfies any
//! allowlist rule, or when an exact-hostname rule equals the string the
//! caller sent. Every failure path (blank input, DNS error, DNS timeout, no
//! records) ends in `Denied`; nothing here returns an error.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use portgate_common::{AllowRule, GateConfig, HostResolver};

use crate::classifier::{host_rule_matches, ip_matches, strip_port};

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenyReason),
}

impl Authorization {
    #[inline]
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed)
    }
}

/// Why a host was refused. Logged server side, never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    EmptyHost,
    NotAllowlisted,
    ResolutionFailed(String),
    ResolutionTimedOut,
    NoAddresses,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::EmptyHost => f.write_str("empty host"),
            DenyReason::NotAllowlisted => f.write_str("no address matches the allowlist"),
            DenyReason::ResolutionFailed(e) => write!(f, "resolution failed: {e}"),
            DenyReason::ResolutionTimedOut => f.write_str("resolution timed out"),
            DenyReason::NoAddresses => f.write_str("resolution returned no addresses"),
        }
    }
}

/// Applies the allowlist to a requested host, resolving DNS when needed.
#[derive(Clone)]
pub struct HostAuthorizer {
    config: Arc<GateConfig>,
    resolver: Arc<dyn HostResolver>,
}

impl HostAuthorizer {
    pub fn new(config: Arc<GateConfig>, resolver: Arc<dyn HostResolver>) -> Self {
        Self { config, resolver }
    }

    fn rules(&self) -> &[AllowRule] {
        &self.config.allowlist
    }

    /// Convenience wrapper over [`authorize`](Self::authorize).
    pub async fn is_authorized(&self, host: &str) -> bool {
        self.authorize(host).await.is_allowed()
    }

    #[instrument(skip(self))]
    pub async fn authorize(&self, host: &str) -> Authorization {
        let decision = self.decide(host).await;
        match &decision {
            Authorization::Allowed => debug!("host allowed"),
            Authorization::Denied(DenyReason::ResolutionFailed(_) | DenyReason::ResolutionTimedOut) => {
                warn!(decision = ?decision, "host denied")
            }
            Authorization::Denied(reason) => info!(%reason, "host denied"),
        }
        decision
    }

    async fn decide(&self, original: &str) -> Authorization {
        let candidate = strip_port(original);
        if candidate.is_empty() {
            return Authorization::Denied(DenyReason::EmptyHost);
        }

        let hostname_allowed = self.rules().iter().any(|r| host_rule_matches(r, original));

        // IP literals never touch DNS.
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            return self.verdict(hostname_allowed || self.any_rule_matches(ip));
        }

        let lookup = tokio::time::timeout(self.config.dns_timeout, self.resolver.lookup(candidate));
        let addrs = match lookup.await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => return Authorization::Denied(DenyReason::ResolutionFailed(format!("{e:#}"))),
            Err(_) => return Authorization::Denied(DenyReason::ResolutionTimedOut),
        };
        if addrs.is_empty() {
            return Authorization::Denied(DenyReason::NoAddresses);
        }

        debug!(addrs = ?addrs, "checking resolved addresses");
        self.verdict(hostname_allowed || addrs.iter().any(|ip| self.any_rule_matches(*ip)))
    }

    fn any_rule_matches(&self, ip: IpAddr) -> bool {
        self.rules().iter().any(|r| ip_matches(r, ip))
    }

    fn verdict(&self, allowed: bool) -> Authorization {
        if allowed {
            Authorization::Allowed
        } else {
            Authorization::Denied(DenyReason::NotAllowlisted)
        }
    }
}

impl fmt::Debug for HostAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostAuthorizer")
            .field("rules", &self.config.allowlist.len())
            .finish()
    }
}
