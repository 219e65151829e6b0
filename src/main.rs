use std::io::IsTerminal;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use adb_port_finder::bridge::AdbBridge;
use adb_port_finder::config::{
    BridgeConfig, ScanConfig, DEFAULT_ADB_PROGRAM, DEFAULT_ADDRESS, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_CONCURRENCY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORTS,
};
use adb_port_finder::console::StdinPrompter;
use adb_port_finder::ports::PortWindow;
use adb_port_finder::session::Session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// adb-port-finder — find a device's wireless debugging port, connect, then install an APK or disconnect.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "adb-port-finder",
    version,
    about = "Find a device's wireless debugging port, connect, then install an APK or disconnect.",
    long_about = None
)]
struct Cli {
    /// IP address of the ADB-enabled device.
    #[arg(long, default_value_t = DEFAULT_ADDRESS)]
    address: IpAddr,

    /// Inclusive port window to scan, e.g. 33000-48000, or a single port.
    #[arg(long, default_value_t = DEFAULT_PORTS)]
    ports: PortWindow,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Max concurrent port probes.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Path to the adb executable.
    #[arg(long, default_value = DEFAULT_ADB_PROGRAM)]
    adb: PathBuf,

    /// Kill an adb command that runs longer than this, in milliseconds.
    #[arg(long = "adb-timeout-ms", default_value_t = DEFAULT_COMMAND_TIMEOUT.as_millis() as u64)]
    adb_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adb_port_finder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let scan = ScanConfig::new(cli.address, cli.ports)
        .with_connect_timeout(Duration::from_millis(cli.timeout_ms))
        .with_concurrency(cli.concurrency);
    let bridge = AdbBridge::new(BridgeConfig {
        program: cli.adb,
        command_timeout: Duration::from_millis(cli.adb_timeout_ms),
    });

    tracing::debug!(?scan, bridge = ?bridge.config(), "configuration");

    let mut session = Session::new(scan, Arc::new(bridge), StdinPrompter::new())
        .with_progress(std::io::stderr().is_terminal());
    session.run().await
}
