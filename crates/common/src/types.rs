//! Core data types for the Portgate probe service
//!
//! Request parameters arrive loosely typed (`CheckParams`, `ScanRangeParams`)
//! and are normalized into `ProbeTarget` / `ScanRequest` before any network
//! I/O happens. Results are plain serde structs so the handlers can emit them
//! as JSON directly.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};

pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = 65535;

/// One allowlist entry.
///
/// Rules are parsed once at startup. A rule that looks like a CIDR block but
/// does not parse is kept as `Malformed` so it can be reported, and never
/// matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AllowRule {
    /// Exact hostname, compared literally against the requested host string.
    Host(String),
    /// Exact IP literal.
    Ip(IpAddr),
    /// Network address + prefix length.
    Cidr(IpNet),
    Malformed(String),
}

impl AllowRule {
    /// Parse a single rule. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.contains('/') {
            return Some(match raw.parse::<IpNet>() {
                Ok(net) => AllowRule::Cidr(net),
                Err(_) => AllowRule::Malformed(raw.to_string()),
            });
        }

        Some(match raw.parse::<IpAddr>() {
            Ok(ip) => AllowRule::Ip(ip),
            Err(_) => AllowRule::Host(raw.to_string()),
        })
    }

    /// Parse a comma-separated rule list, skipping blanks.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',').filter_map(AllowRule::parse).collect()
    }

    #[inline]
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, AllowRule::Malformed(_))
    }
}

impl fmt::Display for AllowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowRule::Host(h) => f.write_str(h),
            AllowRule::Ip(ip) => write!(f, "{ip}"),
            AllowRule::Cidr(net) => write!(f, "{net}"),
            AllowRule::Malformed(raw) => f.write_str(raw),
        }
    }
}

/// Outcome of one TCP connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Connection established.
    Open,
    /// Connection actively refused.
    Closed,
    /// No answer before the deadline.
    Timeout,
    /// Any other failure; see `error_detail`.
    Error,
}

impl ProbeStatus {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Open => "open",
            ProbeStatus::Closed => "closed",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single host:port to probe, with its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl ProbeTarget {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(host: S, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Result of probing a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub host: String,
    pub port: u16,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Wall time spent on the attempt, in milliseconds.
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ProbeResult {
    #[inline]
    #[must_use]
    pub fn new(target: &ProbeTarget, status: ProbeStatus) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            status,
            error_detail: None,
            elapsed_ms: 0,
        }
    }

    /// Shorthand for an `error` result carrying `detail`.
    #[must_use]
    pub fn error<S: Into<String>>(target: &ProbeTarget, detail: S) -> Self {
        Self::new(target, ProbeStatus::Error).with_detail(detail)
    }

    #[inline]
    #[must_use]
    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, ProbeStatus::Open)
    }
}

/// Raw single-port check parameters, as pulled off the query string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckParams {
    pub host: String,
    pub port: i64,
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<u64>,
}

impl CheckParams {
    /// Validate the port and resolve the effective timeout.
    pub fn normalize(&self, config: &GateConfig) -> GateResult<ProbeTarget> {
        let host = require_host(&self.host)?;
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p >= MIN_PORT)
            .ok_or_else(|| {
                GateError::Validation(format!(
                    "port must be between {MIN_PORT} and {MAX_PORT}, got {}",
                    self.port
                ))
            })?;

        Ok(ProbeTarget::new(host, port, config.probe_timeout(self.timeout_ms)))
    }
}

/// Raw range scan body.
///
/// `start` and `end` must be JSON integers; serde rejects strings and floats
/// before this type is ever built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanRangeParams {
    pub host: String,
    pub start: i64,
    pub end: i64,
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub concurrency: Option<i64>,
}

/// A validated range scan: ascending, clamped to the port space, within the
/// configured size cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub host: String,
    pub start: u16,
    pub end: u16,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl ScanRequest {
    /// Normalize raw parameters against the configured limits.
    ///
    /// Start/end order does not matter. The pair is clamped into
    /// `[MIN_PORT, MAX_PORT]`; a range lying entirely outside the port space
    /// or wider than `max_range` is an `InvalidRange`.
    pub fn normalize(params: &ScanRangeParams, config: &GateConfig) -> GateResult<Self> {
        let host = require_host(&params.host)?;

        let lo = params.start.min(params.end).max(i64::from(MIN_PORT));
        let hi = params.start.max(params.end).min(i64::from(MAX_PORT));
        if lo > hi {
            return Err(GateError::InvalidRange(format!(
                "range {}-{} lies outside {MIN_PORT}-{MAX_PORT}",
                params.start, params.end
            )));
        }

        let count = hi - lo + 1;
        let max_range = i64::try_from(config.max_range).unwrap_or(i64::MAX);
        if count > max_range {
            return Err(GateError::InvalidRange(format!(
                "range too large: {count} ports requested, max {}",
                config.max_range
            )));
        }

        let ceiling = i64::try_from(config.max_concurrency.max(1)).unwrap_or(i64::MAX);
        let concurrency = params.concurrency.unwrap_or(ceiling).clamp(1, ceiling);
        let concurrency = usize::try_from(concurrency).unwrap_or(config.max_concurrency);

        // lo/hi are inside [1, 65535] here
        Ok(Self {
            host: host.to_string(),
            start: lo as u16,
            end: hi as u16,
            timeout: config.probe_timeout(params.timeout_ms),
            concurrency,
        })
    }

    #[inline]
    #[must_use]
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }

    #[inline]
    #[must_use]
    pub fn port_count(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Expand into one probe target per port, ascending.
    #[must_use]
    pub fn targets(&self) -> Vec<ProbeTarget> {
        self.ports()
            .map(|port| ProbeTarget::new(self.host.clone(), port, self.timeout))
            .collect()
    }
}

/// Aggregated outcome of a range scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub host: String,
    pub scanned_count: usize,
    pub open_count: usize,
    pub results: Vec<ProbeResult>,
}

impl ScanReport {
    #[must_use]
    pub fn new(host: String, results: Vec<ProbeResult>) -> Self {
        Self {
            host,
            scanned_count: results.len(),
            open_count: results.iter().filter(|r| r.is_open()).count(),
            results,
        }
    }
}

/// Trimmed host, or a validation error when blank.
pub fn require_host(host: &str) -> GateResult<&str> {
    let host = host.trim();
    if host.is_empty() {
        return Err(GateError::Validation("host is required".to_string()));
    }
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: i64, end: i64) -> ScanRangeParams {
        ScanRangeParams {
            host: "127.0.0.1".into(),
            start,
            end,
            timeout_ms: None,
            concurrency: None,
        }
    }

    #[test]
    fn allow_rule_parsing() {
        assert_eq!(
            AllowRule::parse("10.0.0.0/8"),
            Some(AllowRule::Cidr("10.0.0.0/8".parse().unwrap()))
        );
        assert_eq!(
            AllowRule::parse(" 192.168.1.5 "),
            Some(AllowRule::Ip("192.168.1.5".parse().unwrap()))
        );
        assert_eq!(
            AllowRule::parse("nas.local"),
            Some(AllowRule::Host("nas.local".into()))
        );
        assert_eq!(
            AllowRule::parse("10.0.0.0/99"),
            Some(AllowRule::Malformed("10.0.0.0/99".into()))
        );
        assert_eq!(AllowRule::parse("   "), None);
    }

    #[test]
    fn allow_rule_list_skips_blanks() {
        let rules = AllowRule::parse_list("127.0.0.0/8,, ::1 ,printer");
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().all(|r| !r.is_malformed()));
    }

    #[test]
    fn probe_status_serializes_lowercase() {
        let target = ProbeTarget::new("127.0.0.1", 22, Duration::from_secs(1));
        let json = serde_json::to_value(ProbeResult::new(&target, ProbeStatus::Timeout)).unwrap();
        assert_eq!(json["status"], "timeout");
        assert!(json.get("error_detail").is_none());
    }

    #[test]
    fn range_is_order_independent() {
        let cfg = GateConfig::default();
        let req = ScanRequest::normalize(&params(90, 80), &cfg).unwrap();
        assert_eq!((req.start, req.end), (80, 90));
        assert_eq!(req.port_count(), 11);
        let ports: Vec<u16> = req.targets().iter().map(|t| t.port).collect();
        assert_eq!(ports.first(), Some(&80));
        assert_eq!(ports.last(), Some(&90));
    }

    #[test]
    fn range_is_clamped_into_port_space() {
        let cfg = GateConfig::default();
        let req = ScanRequest::normalize(&params(-5, 10), &cfg).unwrap();
        assert_eq!((req.start, req.end), (1, 10));

        let req = ScanRequest::normalize(&params(65530, 70000), &cfg).unwrap();
        assert_eq!((req.start, req.end), (65530, 65535));
    }

    #[test]
    fn range_outside_port_space_is_rejected() {
        let cfg = GateConfig::default();
        let err = ScanRequest::normalize(&params(70000, 80000), &cfg).unwrap_err();
        assert!(matches!(err, GateError::InvalidRange(_)));
    }

    #[test]
    fn range_over_cap_is_rejected() {
        let cfg = GateConfig::default();
        assert!(ScanRequest::normalize(&params(1, 200), &cfg).is_ok());
        let err = ScanRequest::normalize(&params(1, 201), &cfg).unwrap_err();
        assert!(matches!(err, GateError::InvalidRange(_)));
    }

    #[test]
    fn concurrency_is_clamped() {
        let cfg = GateConfig::default();
        let mut p = params(1, 10);
        p.concurrency = Some(0);
        assert_eq!(ScanRequest::normalize(&p, &cfg).unwrap().concurrency, 1);
        p.concurrency = Some(10_000);
        assert_eq!(
            ScanRequest::normalize(&p, &cfg).unwrap().concurrency,
            cfg.max_concurrency
        );
        p.concurrency = Some(10);
        assert_eq!(ScanRequest::normalize(&p, &cfg).unwrap().concurrency, 10);
    }

    #[test]
    fn oversized_limits_do_not_wrap() {
        let cfg = GateConfig {
            max_range: usize::MAX,
            max_concurrency: usize::MAX,
            ..GateConfig::default()
        };
        let mut p = params(1, 10);
        p.concurrency = Some(5);
        let req = ScanRequest::normalize(&p, &cfg).unwrap();
        assert_eq!(req.port_count(), 10);
        assert_eq!(req.concurrency, 5);

        p.concurrency = None;
        assert!(ScanRequest::normalize(&p, &cfg).unwrap().concurrency > 5);
    }

    #[test]
    fn check_port_bounds() {
        let cfg = GateConfig::default();
        let mk = |port| CheckParams {
            host: "127.0.0.1".into(),
            port,
            timeout_ms: None,
        };
        assert!(mk(0).normalize(&cfg).is_err());
        assert!(mk(65536).normalize(&cfg).is_err());
        assert!(mk(-1).normalize(&cfg).is_err());
        let t = mk(65535).normalize(&cfg).unwrap();
        assert_eq!(t.port, 65535);
        assert_eq!(t.timeout, cfg.default_timeout);
    }

    #[test]
    fn blank_host_is_rejected() {
        let cfg = GateConfig::default();
        let p = CheckParams {
            host: "  ".into(),
            port: 80,
            timeout_ms: None,
        };
        assert!(matches!(p.normalize(&cfg), Err(GateError::Validation(_))));
    }

    #[test]
    fn scan_params_reject_non_integer_ports() {
        let ok: Result<ScanRangeParams, _> =
            serde_json::from_str(r#"{"host":"h","start":1,"end":2}"#);
        assert!(ok.is_ok());
        let bad: Result<ScanRangeParams, _> =
            serde_json::from_str(r#"{"host":"h","start":"1","end":2}"#);
        assert!(bad.is_err());
        let bad: Result<ScanRangeParams, _> =
            serde_json::from_str(r#"{"host":"h","start":1.5,"end":2}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn report_counts_open_ports() {
        let t = ProbeTarget::new("h", 1, Duration::from_millis(10));
        let results = vec![
            ProbeResult::new(&t, ProbeStatus::Open),
            ProbeResult::new(&t, ProbeStatus::Closed),
        ];
        let report = ScanReport::new("h".into(), results);
        assert_eq!(report.scanned_count, 2);
        assert_eq!(report.open_count, 1);
    }
}
