//! Pre-handler gates: API key and global rate limit

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

use portgate_common::{GateError, GateResult};

/// Shared-secret check on the `x-api-key` header. Disabled when no key is
/// configured.
#[derive(Clone, Default)]
pub struct ApiKeyGate {
    expected: Option<String>,
}

impl ApiKeyGate {
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    pub fn check(&self, provided: Option<&str>) -> GateResult<()> {
        match (&self.expected, provided) {
            (None, _) => Ok(()),
            (Some(expected), Some(given)) if constant_time_eq(expected.as_bytes(), given.as_bytes()) => Ok(()),
            _ => Err(GateError::Unauthorized),
        }
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Process-wide request budget, one bucket for all callers.
pub struct RateGate {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RateGate {
    /// `per_minute == 0` disables limiting.
    pub fn per_minute(per_minute: u32) -> Self {
        Self {
            limiter: NonZeroU32::new(per_minute).map(|n| RateLimiter::direct(Quota::per_minute(n))),
        }
    }

    pub fn check(&self) -> GateResult<()> {
        match &self.limiter {
            Some(limiter) if limiter.check().is_err() => Err(GateError::RateLimited),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_key_gate_lets_everything_through() {
        let gate = ApiKeyGate::new(None);
        assert!(gate.check(None).is_ok());
        assert!(gate.check(Some("anything")).is_ok());
    }

    #[test]
    fn key_gate_requires_exact_key() {
        let gate = ApiKeyGate::new(Some("s3cret".into()));
        assert!(gate.check(Some("s3cret")).is_ok());
        assert_eq!(gate.check(None), Err(GateError::Unauthorized));
        assert_eq!(gate.check(Some("s3cre")), Err(GateError::Unauthorized));
        assert_eq!(gate.check(Some("s3creT")), Err(GateError::Unauthorized));
    }

    #[test]
    fn rate_gate_exhausts_its_burst() {
        let gate = RateGate::per_minute(2);
        assert!(gate.check().is_ok());
        assert!(gate.check().is_ok());
        assert_eq!(gate.check(), Err(GateError::RateLimited));
    }

    #[test]
    fn zero_rate_disables_limiting() {
        let gate = RateGate::per_minute(0);
        for _ in 0..1000 {
            assert!(gate.check().is_ok());
        }
    }
}
