//! Route dispatch and the `/tcp/*` handlers

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use portgate_common::{
    CheckParams, GateConfig, GateError, GateResult, ProbeResult, ScanRangeParams, ScanReport,
};
use portgate_orchestrator::ScanOrchestrator;
use portgate_scanner_tcp::TcpProber;
use portgate_target_resolver::{DnsResolver, HostAuthorizer};

use crate::gate::{ApiKeyGate, RateGate};
use crate::request::{ApiRequest, ApiResponse, Method};

pub const CHECK_PATH: &str = "/tcp/check";
pub const SCAN_RANGE_PATH: &str = "/tcp/scan-range";

#[derive(Serialize)]
struct CheckResponse<'a> {
    ok: bool,
    result: &'a ProbeResult,
}

#[derive(Serialize)]
struct ScanResponse<'a> {
    ok: bool,
    #[serde(flatten)]
    report: &'a ScanReport,
}

pub struct PortgateApi {
    orchestrator: ScanOrchestrator,
    key_gate: ApiKeyGate,
    rate_gate: RateGate,
}

impl PortgateApi {
    /// Wire the production stack: system DNS resolver and TCP connect prober.
    pub fn from_config(config: GateConfig) -> Self {
        let config = Arc::new(config);
        let resolver = Arc::new(DnsResolver::new(config.dns_timeout));
        let authorizer = HostAuthorizer::new(config.clone(), resolver);
        let orchestrator = ScanOrchestrator::new(config, authorizer, Arc::new(TcpProber::new()));
        Self::new(orchestrator)
    }

    /// Gates are configured from the orchestrator's config snapshot.
    pub fn new(orchestrator: ScanOrchestrator) -> Self {
        let config = orchestrator.config();
        let key_gate = ApiKeyGate::new(config.api_key.clone());
        let rate_gate = RateGate::per_minute(config.rate_limit_per_min);
        Self {
            orchestrator,
            key_gate,
            rate_gate,
        }
    }

    /// Run the gates, then dispatch to the matching handler.
    #[instrument(skip(self, req), fields(method = %req.method, path = %req.path))]
    pub async fn handle(&self, req: &ApiRequest) -> ApiResponse {
        let response = match self.admit(req) {
            Ok(()) => self.route(req).await,
            Err(e) => e.into(),
        };
        info!(status = response.status, "request handled");
        response
    }

    fn admit(&self, req: &ApiRequest) -> GateResult<()> {
        self.rate_gate.check()?;
        self.key_gate.check(req.api_key.as_deref())
    }

    async fn route(&self, req: &ApiRequest) -> ApiResponse {
        match (req.path.as_str(), &req.method) {
            (CHECK_PATH, Method::Get) => self.tcp_check(&req.query).await,
            (SCAN_RANGE_PATH, Method::Post) => self.tcp_scan_range(req.body.as_deref().unwrap_or("")).await,
            (CHECK_PATH | SCAN_RANGE_PATH, _) => GateError::MethodNotAllowed.into(),
            _ => GateError::NotFound.into(),
        }
    }

    /// `GET /tcp/check?host=&port=&timeout=`
    pub async fn tcp_check(&self, query: &HashMap<String, String>) -> ApiResponse {
        let outcome = match parse_check_query(query) {
            Ok(params) => self.orchestrator.check(&params).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => ApiResponse::ok(&CheckResponse {
                ok: true,
                result: &result,
            }),
            Err(e) => reject(e),
        }
    }

    /// `POST /tcp/scan-range` with `{host, start, end, timeout?, concurrency?}`
    pub async fn tcp_scan_range(&self, body: &str) -> ApiResponse {
        let outcome = match parse_scan_body(body) {
            Ok(params) => self.orchestrator.scan_range(&params).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(report) => ApiResponse::ok(&ScanResponse {
                ok: true,
                report: &report,
            }),
            Err(e) => reject(e),
        }
    }
}

fn reject(e: GateError) -> ApiResponse {
    debug!(kind = e.kind(), error = %e, "request rejected");
    e.into()
}

fn parse_check_query(query: &HashMap<String, String>) -> GateResult<CheckParams> {
    let field = |name: &str| query.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    let (host, port) = match (field("host"), field("port")) {
        (Some(host), Some(port)) => (host, port),
        _ => return Err(GateError::Validation("host and port are required".to_string())),
    };
    let port = port
        .parse::<i64>()
        .map_err(|_| GateError::Validation(format!("port must be an integer, got '{port}'")))?;
    let timeout_ms = field("timeout")
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| GateError::Validation(format!("timeout must be a non-negative integer, got '{t}'")))
        })
        .transpose()?;

    Ok(CheckParams {
        host: host.to_string(),
        port,
        timeout_ms,
    })
}

fn parse_scan_body(body: &str) -> GateResult<ScanRangeParams> {
    serde_json::from_str(body).map_err(|e| {
        GateError::Validation(format!(
            "host plus integer start and end are required: {e}"
        ))
    })
}
