//! Seam traits between the Portgate components
//!
//! The orchestrator only talks to probing and DNS through these traits, so
//! tests can swap in instrumented fakes.

use crate::types::{ProbeResult, ProbeTarget};
use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// A single bounded-duration port probe.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one target.
    ///
    /// Network outcomes (open, refused, timed out, unreachable) belong in the
    /// returned `ProbeResult`. `Err` is reserved for internal failures; the
    /// scheduler turns those into `error` results for the affected port.
    async fn probe(&self, target: &ProbeTarget) -> Result<ProbeResult>;

    /// Prober name/identifier
    fn name(&self) -> &str;
}

/// Hostname to address resolution.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve every A and AAAA record for `host`.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeStatus;
    use std::time::Duration;

    struct MockProber;

    #[async_trait]
    impl Prober for MockProber {
        async fn probe(&self, target: &ProbeTarget) -> Result<ProbeResult> {
            Ok(ProbeResult::new(target, ProbeStatus::Open))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_prober_trait_object() {
        let prober: Box<dyn Prober> = Box::new(MockProber);
        let target = ProbeTarget::new("127.0.0.1", 80, Duration::from_millis(100));

        let result = prober.probe(&target).await.unwrap();
        assert_eq!(result.port, 80);
        assert!(result.is_open());
    }
}
