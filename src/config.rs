use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::ports::PortWindow;

/// Address of the device when none is given on the command line.
pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5));
/// Wireless debugging picks its port from roughly this window.
pub const DEFAULT_PORTS: PortWindow = PortWindow::new(33000, 48000);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_CONCURRENCY: usize = 512;
/// Upper bound applied to any requested concurrency.
pub const MAX_CONCURRENCY: usize = 5_000;
pub const DEFAULT_ADB_PROGRAM: &str = "adb";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a single scan needs, passed in at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub address: IpAddr,
    pub ports: PortWindow,
    /// Bound on each raw TCP connect attempt.
    pub connect_timeout: Duration,
    /// Max probes in flight at once.
    pub concurrency: usize,
}

impl ScanConfig {
    pub fn new(address: IpAddr, ports: PortWindow) -> Self {
        Self {
            address,
            ports,
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Concurrency clamped to `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            ports: DEFAULT_PORTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// How the external bridge tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub program: PathBuf,
    /// A command still running after this long is killed.
    pub command_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ADB_PROGRAM),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}
