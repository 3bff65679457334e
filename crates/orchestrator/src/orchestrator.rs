// crates/orchestrator/src/orchestrator.rs
//! Scan orchestrator - validation, authorization and probe dispatch

use anyhow::{anyhow, Error};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use portgate_common::{
    require_host, CheckParams, GateConfig, GateError, GateResult, ProbeResult, ProbeTarget,
    Prober, ScanRangeParams, ScanReport, ScanRequest,
};
use portgate_target_resolver::{strip_port, HostAuthorizer};

use crate::scheduler::BoundedScheduler;

/// Entry point for both request shapes. Cheap to clone; everything inside is
/// shared read-only.
#[derive(Clone)]
pub struct ScanOrchestrator {
    config: Arc<GateConfig>,
    authorizer: HostAuthorizer,
    prober: Arc<dyn Prober>,
}

impl ScanOrchestrator {
    pub fn new(config: Arc<GateConfig>, authorizer: HostAuthorizer, prober: Arc<dyn Prober>) -> Self {
        Self {
            config,
            authorizer,
            prober,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Probe a single port after validating and authorizing the host.
    ///
    /// The probe runs in its own task, so a prober error or panic becomes an
    /// `error` result just as it does for range scans.
    #[instrument(skip(self, params), fields(host = %params.host, port = params.port))]
    pub async fn check(&self, params: &CheckParams) -> GateResult<ProbeResult> {
        let mut target = params.normalize(&self.config)?;
        self.authorize(&target.host).await?;
        target.host = strip_port(&target.host).to_string();

        let prober = self.prober.clone();
        let spawned = target.clone();
        let outcome = tokio::spawn(async move { prober.probe(&spawned).await }).await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => probe_failure(target, e),
            Err(join) => probe_failure(target, anyhow!("worker panicked: {join}")),
        };
        info!(status = %result.status, "check finished");
        Ok(result)
    }

    /// Probe a contiguous port range on one host with bounded concurrency.
    #[instrument(skip(self, params), fields(scan_id = %Uuid::new_v4(), host = %params.host))]
    pub async fn scan_range(&self, params: &ScanRangeParams) -> GateResult<ScanReport> {
        let host = require_host(&params.host)?;
        self.authorize(host).await?;

        let request = ScanRequest {
            host: strip_port(host).to_string(),
            ..ScanRequest::normalize(params, &self.config)?
        };
        info!(
            start = request.start,
            end = request.end,
            concurrency = request.concurrency,
            "scanning range"
        );

        let prober = self.prober.clone();
        let scheduler = BoundedScheduler::new(request.concurrency);
        let results = scheduler
            .run(
                request.targets(),
                move |target: ProbeTarget| {
                    let prober = prober.clone();
                    async move { prober.probe(&target).await }
                },
                probe_failure,
            )
            .await;

        let report = ScanReport::new(request.host, results);
        info!(
            scanned = report.scanned_count,
            open = report.open_count,
            "range scan finished"
        );
        Ok(report)
    }

    async fn authorize(&self, host: &str) -> GateResult<()> {
        if self.authorizer.authorize(host).await.is_allowed() {
            Ok(())
        } else {
            Err(GateError::Forbidden)
        }
    }
}

fn probe_failure(target: ProbeTarget, e: Error) -> ProbeResult {
    ProbeResult::error(&target, format!("probe failed: {e:#}"))
}
