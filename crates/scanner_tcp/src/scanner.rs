// crates/scanner_tcp/src/scanner.rs
//! TCP connect prober implementation

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::io::{self, ErrorKind};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, instrument};

use portgate_common::{ProbeResult, ProbeStatus, ProbeTarget, Prober};

/// Plain TCP connect prober.
///
/// The deadline comes from each [`ProbeTarget`]; name resolution for
/// hostnames happens inside that deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpProber {
    #[instrument(skip(self, target), fields(target = %target))]
    async fn probe(&self, target: &ProbeTarget) -> Result<ProbeResult> {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        let result = probe_connect(target, connect).await;
        debug!(status = %result.status, elapsed_ms = result.elapsed_ms, "probe finished");
        Ok(result)
    }

    fn name(&self) -> &str {
        "TCP Connect Prober"
    }
}

/// Race `connect` against the target deadline and classify the outcome.
///
/// Whatever `connect` yields (or is holding when the deadline fires) is
/// dropped before returning, which closes the socket on every path.
async fn probe_connect<F, S>(target: &ProbeTarget, connect: F) -> ProbeResult
where
    F: Future<Output = io::Result<S>>,
{
    let start = Instant::now();
    let outcome = timeout(target.timeout, connect).await;
    let elapsed = start.elapsed();

    let result = match outcome {
        Ok(Ok(stream)) => {
            drop(stream);
            ProbeResult::new(target, ProbeStatus::Open)
        }
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
            ProbeResult::new(target, ProbeStatus::Closed).with_detail("ECONNREFUSED")
        }
        Ok(Err(e)) => ProbeResult::error(target, describe(&e)),
        Err(_) => ProbeResult::new(target, ProbeStatus::Timeout),
    };
    result.with_elapsed(elapsed)
}

/// errno-style code where one is recognisable, plus the OS message.
fn describe(e: &io::Error) -> String {
    let code = match e.kind() {
        ErrorKind::ConnectionReset => Some("ECONNRESET"),
        ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        ErrorKind::AddrNotAvailable => Some("EADDRNOTAVAIL"),
        ErrorKind::PermissionDenied => Some("EACCES"),
        ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => None,
    };
    match code {
        Some(code) => format!("{code}: {e}"),
        None => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn target(host: &str, port: u16, ms: u64) -> ProbeTarget {
        ProbeTarget::new(host, port, Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = TcpProber::new().probe(&target("127.0.0.1", port, 2000)).await.unwrap();
        assert_eq!(result.status, ProbeStatus::Open);
        assert_eq!(result.port, port);
        assert!(result.error_detail.is_none());
    }

    #[tokio::test]
    async fn refused_port_is_closed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpProber::new().probe(&target("127.0.0.1", port, 2000)).await.unwrap();
        assert_eq!(result.status, ProbeStatus::Closed);
        assert_eq!(result.error_detail.as_deref(), Some("ECONNREFUSED"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_target_times_out_at_the_deadline() {
        let t = target("10.0.0.1", 80, 2000);
        let start = Instant::now();
        let result = probe_connect(&t, std::future::pending::<io::Result<TcpStream>>()).await;

        assert_eq!(result.status, ProbeStatus::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert!(result.elapsed_ms >= 2000);
    }

    #[tokio::test]
    async fn other_socket_errors_are_reported() {
        let t = target("10.0.0.1", 80, 2000);
        let failing = async { Err::<TcpStream, _>(io::Error::new(ErrorKind::ConnectionReset, "reset by peer")) };
        let result = probe_connect(&t, failing).await;

        assert_eq!(result.status, ProbeStatus::Error);
        let detail = result.error_detail.unwrap();
        assert!(detail.starts_with("ECONNRESET"), "{detail}");
    }

    #[tokio::test]
    async fn repeated_probes_are_independent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let prober = TcpProber::new();
        let t = target("127.0.0.1", port, 2000);

        let a = prober.probe(&t).await.unwrap();
        let b = prober.probe(&t).await.unwrap();
        assert_eq!(a.status, b.status);
    }
}
