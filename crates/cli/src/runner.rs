// runner.rs
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Instant;
use tracing::info;

use portgate_api::{ApiRequest, ApiResponse, PortgateApi, CHECK_PATH, SCAN_RANGE_PATH};
use portgate_common::{AllowRule, GateConfig};

use crate::args::{ClientArgs, ConfigOverrides};
use crate::output::print_response;

/// Environment first, then command-line overrides.
pub fn load_config(overrides: &ConfigOverrides) -> Result<GateConfig> {
    let mut config = GateConfig::from_env().context("Failed to load configuration")?;
    apply_overrides(&mut config, overrides);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut GateConfig, overrides: &ConfigOverrides) {
    if !overrides.allow.is_empty() {
        let rules = overrides
            .allow
            .iter()
            .filter_map(|raw| AllowRule::parse(raw))
            .collect();
        *config = std::mem::take(config).with_allowlist(rules);
    }
    if let Some(max_range) = overrides.max_range {
        config.max_range = max_range;
    }
    if let Some(max_concurrency) = overrides.max_concurrency {
        config.max_concurrency = max_concurrency;
    }
}

pub async fn run_check(
    api: &PortgateApi,
    host: String,
    port: i64,
    timeout: Option<u64>,
    client: ClientArgs,
) -> Result<bool> {
    info!("Checking {}:{}", host, port);
    let mut req = ApiRequest::get(CHECK_PATH)
        .with_query("host", host)
        .with_query("port", port.to_string());
    if let Some(ms) = timeout {
        req = req.with_query("timeout", ms.to_string());
    }
    dispatch(api, req, client).await
}

pub async fn run_scan_range(
    api: &PortgateApi,
    host: String,
    start: i64,
    end: i64,
    timeout: Option<u64>,
    concurrency: Option<i64>,
    client: ClientArgs,
) -> Result<bool> {
    info!("Scanning {} ports {}-{}", host, start, end);
    let mut body = json!({ "host": host, "start": start, "end": end });
    if let Some(ms) = timeout {
        body["timeout"] = json!(ms);
    }
    if let Some(c) = concurrency {
        body["concurrency"] = json!(c);
    }
    let req = ApiRequest::post(SCAN_RANGE_PATH, body.to_string());
    dispatch(api, req, client).await
}

async fn dispatch(api: &PortgateApi, mut req: ApiRequest, client: ClientArgs) -> Result<bool> {
    if let Some(key) = client.api_key {
        req = req.with_api_key(key);
    }

    let started = Instant::now();
    let response: ApiResponse = api.handle(&req).await;
    print_response(&response, &client.output_format, started.elapsed())?;
    Ok(response.is_success())
}

pub fn describe_config(config: &GateConfig) -> serde_json::Value {
    json!({
        "allowlist": config.allowlist.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "malformed_rules": config.allowlist.iter().filter(|r| r.is_malformed()).count(),
        "max_range": config.max_range,
        "max_concurrency": config.max_concurrency,
        "default_timeout_ms": config.default_timeout.as_millis() as u64,
        "max_timeout_ms": config.max_timeout.as_millis() as u64,
        "dns_timeout_ms": config.dns_timeout.as_millis() as u64,
        "api_key_required": config.api_key.is_some(),
        "rate_limit_per_min": config.rate_limit_per_min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_allowlist_and_limits() {
        let mut config = GateConfig::default();
        let overrides = ConfigOverrides {
            allow: vec!["10.1.0.0/16".into(), " ".into(), "nas.lan".into()],
            max_range: Some(20),
            max_concurrency: None,
        };
        apply_overrides(&mut config, &overrides);

        assert_eq!(config.allowlist.len(), 2);
        assert_eq!(config.max_range, 20);
        assert_eq!(config.max_concurrency, 50);
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = GateConfig::default();
        apply_overrides(&mut config, &ConfigOverrides::default());
        assert_eq!(config.allowlist.len(), 5);
    }

    #[test]
    fn config_description_hides_the_key() {
        let config = GateConfig {
            api_key: Some("hunter2".into()),
            ..GateConfig::default()
        };
        let described = describe_config(&config);
        assert_eq!(described["api_key_required"], true);
        assert!(!described.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn public_check_is_refused() {
        let api = PortgateApi::from_config(GateConfig::default());
        let client = ClientArgs {
            api_key: None,
            output_format: "json".into(),
        };
        let ok = run_check(&api, "8.8.8.8".into(), 53, None, client).await.unwrap();
        assert!(!ok);
    }
}
