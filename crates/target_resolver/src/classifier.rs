//! Address classification against allowlist rules
//!
//! Everything here is pure and total: malformed rules or candidates simply
//! fail to match.

use portgate_common::AllowRule;
use std::net::IpAddr;

/// Does `address` (an IP literal as text) satisfy `rule`?
///
/// Hostname rules never match here; they only apply to the original request
/// string, see [`host_rule_matches`].
#[must_use]
pub fn rule_matches(rule: &AllowRule, address: &str) -> bool {
    match address.trim().parse::<IpAddr>() {
        Ok(ip) => ip_matches(rule, ip),
        Err(_) => false,
    }
}

/// Typed variant of [`rule_matches`].
///
/// IPv4-mapped IPv6 candidates are also tried in their IPv4 form.
#[must_use]
pub fn ip_matches(rule: &AllowRule, ip: IpAddr) -> bool {
    let canonical = ip.to_canonical();
    match rule {
        AllowRule::Ip(allowed) => *allowed == ip || allowed.to_canonical() == canonical,
        AllowRule::Cidr(net) => net.contains(&ip) || net.contains(&canonical),
        AllowRule::Host(_) | AllowRule::Malformed(_) => false,
    }
}

/// Exact hostname rule against the host string as the caller sent it.
#[must_use]
pub fn host_rule_matches(rule: &AllowRule, original: &str) -> bool {
    matches!(rule, AllowRule::Host(name) if name == original)
}

/// Drop a trailing `:port` accidentally included in a host string.
///
/// Bare IPv6 literals are returned untouched; `[v6]` and `[v6]:port` lose
/// their brackets and port.
#[must_use]
pub fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }

    if let Some(rest) = host.strip_prefix('[') {
        if let Some((inner, tail)) = rest.split_once(']') {
            if tail.is_empty() || tail.strip_prefix(':').is_some_and(is_port) {
                return inner;
            }
        }
        return host;
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && is_port(port) => name,
        _ => host,
    }
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(raw: &str) -> AllowRule {
        AllowRule::parse(raw).unwrap()
    }

    #[test]
    fn cidr_containment() {
        let r = rule("192.168.0.0/16");
        assert!(rule_matches(&r, "192.168.0.1"));
        assert!(rule_matches(&r, "192.168.255.255"));
        assert!(!rule_matches(&r, "192.169.0.1"));
        assert!(!rule_matches(&r, "10.0.0.1"));

        let r = rule("172.16.0.0/12");
        assert!(rule_matches(&r, "172.31.255.1"));
        assert!(!rule_matches(&r, "172.32.0.1"));
    }

    #[test]
    fn cidr_with_host_bits_uses_network() {
        let r = rule("10.1.2.3/8");
        assert!(rule_matches(&r, "10.200.0.1"));
    }

    #[test]
    fn ipv6_cidr_and_family_mismatch() {
        let r = rule("fd00::/8");
        assert!(rule_matches(&r, "fd12:3456::1"));
        assert!(!rule_matches(&r, "10.0.0.1"));
        assert!(!rule_matches(&rule("10.0.0.0/8"), "fd00::1"));
    }

    #[test]
    fn mapped_ipv4_is_canonicalised() {
        assert!(rule_matches(&rule("10.0.0.0/8"), "::ffff:10.1.1.1"));
        assert!(rule_matches(&rule("192.168.1.1"), "::ffff:192.168.1.1"));
    }

    #[test]
    fn exact_ip_rule() {
        let r = rule("192.168.1.10");
        assert!(rule_matches(&r, "192.168.1.10"));
        assert!(!rule_matches(&r, "192.168.1.11"));
        assert!(rule_matches(&rule("::1"), "0:0:0:0:0:0:0:1"));
    }

    #[test]
    fn malformed_inputs_never_match() {
        let bad = rule("10.0.0.0/40");
        assert!(bad.is_malformed());
        assert!(!rule_matches(&bad, "10.0.0.1"));
        assert!(!rule_matches(&rule("10.0.0.0/8"), "not-an-ip"));
        assert!(!rule_matches(&rule("10.0.0.0/8"), ""));
        assert!(!rule_matches(&rule("10.0.0.0/8"), "10.0.0.256"));
    }

    #[test]
    fn hostname_rules_only_match_the_original_string() {
        let r = rule("nas.local");
        assert!(!rule_matches(&r, "192.168.1.2"));
        assert!(host_rule_matches(&r, "nas.local"));
        assert!(!host_rule_matches(&r, "nas.local:8080"));
        assert!(!host_rule_matches(&rule("10.0.0.0/8"), "10.0.0.1"));
    }

    #[test]
    fn port_suffix_stripping() {
        assert_eq!(strip_port("10.0.0.1:8080"), "10.0.0.1");
        assert_eq!(strip_port("printer.lan:631"), "printer.lan");
        assert_eq!(strip_port("printer.lan"), "printer.lan");
        assert_eq!(strip_port("::1"), "::1");
        assert_eq!(strip_port("fe80::1"), "fe80::1");
        assert_eq!(strip_port("[::1]:22"), "::1");
        assert_eq!(strip_port("[::1]"), "::1");
        assert_eq!(strip_port("host:abc"), "host:abc");
        assert_eq!(strip_port("host:"), "host:");
    }
}
