use crate::bridge::{endpoint, is_connect_success, DeviceBridge};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::types::{ScanOutcome, ScanResult};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Find the port on which the device at `config.address` accepts bridge connections.
///
/// - Limits concurrent probes using a `Semaphore`.
/// - Uses `tokio::time::timeout` to bound each raw TCP connect.
/// - Ports that accept a connection are confirmed with the bridge's `connect`.
/// - The first confirmed port is claimed; later confirmations are ignored and no
///   new probes are launched, but every launched probe is joined before returning.
pub async fn find_open_port(
    config: &ScanConfig,
    bridge: Arc<dyn DeviceBridge>,
) -> Result<ScanOutcome, ScanError> {
    find_open_port_with_progress(config, bridge, ScanProgress::new()).await
}

/// Progress counters shared with whoever renders them. Advisory only.
#[derive(Clone, Debug)]
pub struct ScanProgress {
    pub total: Arc<AtomicU64>,
    pub launched: Arc<AtomicU64>,
    pub probed: Arc<AtomicU64>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            total: Arc::new(AtomicU64::new(0)),
            launched: Arc::new(AtomicU64::new(0)),
            probed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fraction of probes finished, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        (self.probed.load(Ordering::Relaxed) as f64 / total as f64).min(1.0)
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Variant of [`find_open_port`] that reports into caller-owned counters.
pub async fn find_open_port_with_progress(
    config: &ScanConfig,
    bridge: Arc<dyn DeviceBridge>,
    progress: ScanProgress,
) -> Result<ScanOutcome, ScanError> {
    let total = config.ports.len();
    progress.total.store(total, Ordering::Relaxed);
    if config.ports.is_empty() {
        debug!("empty port window, nothing to probe");
        return Ok(ScanOutcome::NotFound);
    }

    info!(
        address = %config.address,
        ports = %config.ports,
        concurrency = config.effective_concurrency(),
        "scanning for bridge port"
    );
    let started = Instant::now();

    let result = Arc::new(Mutex::new(ScanResult::new()));
    let sem = Arc::new(Semaphore::new(config.effective_concurrency()));
    let claimed = CancellationToken::new();
    let mut set = JoinSet::new();

    for port in config.ports {
        if claimed.is_cancelled() {
            break;
        }
        let permit = tokio::select! {
            permit = sem.clone().acquire_owned() => permit.expect("semaphore in scope"),
            _ = claimed.cancelled() => break,
        };
        progress.launched.fetch_add(1, Ordering::Relaxed);

        let probe = Probe {
            address: config.address,
            port,
            timeout: config.connect_timeout,
        };
        let bridge = bridge.clone();
        let result = result.clone();
        let claimed = claimed.clone();
        let probed = progress.probed.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            probe.run(bridge.as_ref(), &result, &claimed).await;
            probed.fetch_add(1, Ordering::Relaxed);
        });
    }

    let mut first_err = None;
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            first_err.get_or_insert(e);
        }
    }

    let outcome = result.lock().await.clone().into_outcome();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        launched = progress.launched.load(Ordering::Relaxed),
        port = ?outcome.port(),
        "scan finished"
    );
    // A confirmed port is still a valid answer even if some other probe died.
    match (outcome, first_err) {
        (found @ ScanOutcome::Found(_), _) => Ok(found),
        (ScanOutcome::NotFound, Some(e)) => Err(ScanError::ProbeTask(e)),
        (ScanOutcome::NotFound, None) => Ok(ScanOutcome::NotFound),
    }
}

/// One port check: raw connect, then bridge confirmation, then claim.
struct Probe {
    address: IpAddr,
    port: u16,
    timeout: Duration,
}

impl Probe {
    async fn run(
        &self,
        bridge: &dyn DeviceBridge,
        result: &Mutex<ScanResult>,
        claimed: &CancellationToken,
    ) {
        if claimed.is_cancelled() {
            return;
        }
        if !self.is_open().await {
            return;
        }
        // Don't connect the tool to more endpoints once we have an answer.
        if claimed.is_cancelled() {
            return;
        }

        let target = endpoint(self.address, self.port);
        let output = match bridge.connect(&target).await {
            Ok(output) => output,
            Err(e) => {
                debug!(%target, error = %e, "bridge connect failed");
                return;
            }
        };
        if !is_connect_success(&output) {
            debug!(%target, %output, "bridge rejected open port");
            return;
        }

        let mut guard = result.lock().await;
        if guard.claim(self.port, output) {
            info!(port = self.port, "claimed bridge port");
            claimed.cancel();
        } else {
            debug!(port = self.port, winner = ?guard.port, "port confirmed after claim, ignored");
        }
    }

    async fn is_open(&self) -> bool {
        let addr = SocketAddr::new(self.address, self.port);
        match time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                trace!(port = self.port, "port open");
                true
            }
            _ => false, // closed, filtered, or timed out
        }
    }
}
