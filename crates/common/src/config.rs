//! Process-wide configuration snapshot
//!
//! Built once at startup (from `PORTGATE_*` environment variables, then CLI
//! overrides) and shared read-only behind an `Arc` afterwards.

use std::time::Duration;
use tracing::warn;

use crate::error::{GateError, GateResult};
use crate::types::{AllowRule, MAX_PORT};

pub const ENV_ALLOWLIST: &str = "PORTGATE_ALLOWLIST";
pub const ENV_MAX_RANGE: &str = "PORTGATE_MAX_RANGE";
pub const ENV_MAX_CONCURRENCY: &str = "PORTGATE_MAX_CONCURRENCY";
pub const ENV_DEFAULT_TIMEOUT_MS: &str = "PORTGATE_DEFAULT_TIMEOUT_MS";
pub const ENV_MAX_TIMEOUT_MS: &str = "PORTGATE_MAX_TIMEOUT_MS";
pub const ENV_DNS_TIMEOUT_MS: &str = "PORTGATE_DNS_TIMEOUT_MS";
pub const ENV_API_KEY: &str = "PORTGATE_API_KEY";
pub const ENV_RATE_LIMIT_PER_MIN: &str = "PORTGATE_RATE_LIMIT_PER_MIN";

/// Loopback plus the RFC 1918 private ranges.
/// Upper bound accepted for `max_concurrency`.
pub const CONCURRENCY_CEILING: usize = 1024;

pub const DEFAULT_ALLOWLIST: &str = "127.0.0.0/8,::1/128,10.0.0.0/8,172.16.0.0/12,192.168.0.0/16";

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub allowlist: Vec<AllowRule>,
    /// Largest number of ports a single range scan may cover.
    pub max_range: usize,
    /// Ceiling on in-flight probes per scan.
    pub max_concurrency: usize,
    pub default_timeout: Duration,
    pub max_timeout: Duration,
    pub dns_timeout: Duration,
    /// `None` disables the API key gate.
    pub api_key: Option<String>,
    /// Global requests per minute; 0 disables the limiter.
    pub rate_limit_per_min: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            allowlist: AllowRule::parse_list(DEFAULT_ALLOWLIST),
            max_range: 200,
            max_concurrency: 50,
            default_timeout: Duration::from_millis(2000),
            max_timeout: Duration::from_millis(10_000),
            dns_timeout: Duration::from_millis(3000),
            api_key: None,
            rate_limit_per_min: 120,
        }
    }
}

impl GateConfig {
    /// Load from the process environment.
    pub fn from_env() -> GateResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> GateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get(ENV_ALLOWLIST) {
            cfg = cfg.with_allowlist(AllowRule::parse_list(&raw));
        }
        if let Some(raw) = get(ENV_MAX_RANGE) {
            cfg.max_range = parse_positive(ENV_MAX_RANGE, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_CONCURRENCY) {
            cfg.max_concurrency = parse_positive(ENV_MAX_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = get(ENV_DEFAULT_TIMEOUT_MS) {
            cfg.default_timeout = Duration::from_millis(parse_positive(ENV_DEFAULT_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_MAX_TIMEOUT_MS) {
            cfg.max_timeout = Duration::from_millis(parse_positive(ENV_MAX_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_DNS_TIMEOUT_MS) {
            cfg.dns_timeout = Duration::from_millis(parse_positive(ENV_DNS_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_RATE_LIMIT_PER_MIN) {
            cfg.rate_limit_per_min = raw.trim().parse().map_err(|_| {
                GateError::Config(format!("{ENV_RATE_LIMIT_PER_MIN} must be an integer, got '{raw}'"))
            })?;
        }
        cfg.api_key = get(ENV_API_KEY).map(|k| k.trim().to_string());

        cfg.validate()?;
        Ok(cfg)
    }

    /// Replace the allowlist, reporting rules that will never match.
    #[must_use]
    pub fn with_allowlist(mut self, rules: Vec<AllowRule>) -> Self {
        for rule in rules.iter().filter(|r| r.is_malformed()) {
            warn!(rule = %rule, "ignoring malformed allowlist rule");
        }
        self.allowlist = rules;
        self
    }

    /// Effective probe deadline for a requested timeout in milliseconds.
    ///
    /// Absent or zero means the default; anything above the ceiling is clamped.
    #[must_use]
    pub fn probe_timeout(&self, requested_ms: Option<u64>) -> Duration {
        match requested_ms {
            None | Some(0) => self.default_timeout,
            Some(ms) => Duration::from_millis(ms).min(self.max_timeout),
        }
    }

    pub fn validate(&self) -> GateResult<()> {
        if self.default_timeout > self.max_timeout {
            return Err(GateError::Config(format!(
                "default timeout {}ms exceeds max timeout {}ms",
                self.default_timeout.as_millis(),
                self.max_timeout.as_millis()
            )));
        }
        if self.max_range == 0 || self.max_concurrency == 0 {
            return Err(GateError::Config(
                "max range and max concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_range > usize::from(MAX_PORT) {
            return Err(GateError::Config(format!(
                "max range {} exceeds the {MAX_PORT} port space",
                self.max_range
            )));
        }
        if self.max_concurrency > CONCURRENCY_CEILING {
            return Err(GateError::Config(format!(
                "max concurrency {} exceeds the ceiling of {CONCURRENCY_CEILING}",
                self.max_concurrency
            )));
        }
        Ok(())
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> GateResult<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(GateError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
