//! The external debug-bridge tool.
//!
//! [`DeviceBridge`] is the seam the scanner and the session talk through;
//! [`AdbBridge`] implements it by running the `adb` binary. Output is treated
//! as opaque text and only matched for a few markers, since its format is not
//! stable across tool versions.

use std::net::IpAddr;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::types::ConnectedDevice;

/// Operations the program needs from the debug bridge.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Connect to `endpoint` (`address:port`) and return the tool's output.
    async fn connect(&self, endpoint: &str) -> Result<String, BridgeError>;

    /// List attached devices, one per line.
    async fn devices(&self) -> Result<String, BridgeError>;

    async fn install(&self, package: &Path) -> Result<String, BridgeError>;

    /// Disconnect `target`, either `address:port` or a bare address.
    async fn disconnect(&self, target: &str) -> Result<String, BridgeError>;
}

/// Runs the real `adb` executable.
#[derive(Debug, Clone, Default)]
pub struct AdbBridge {
    config: BridgeConfig,
}

impl AdbBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn run<I, S>(&self, args: I) -> Result<String, BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let program = self.config.program.display().to_string();
        let args: Vec<std::ffi::OsString> =
            args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = std::iter::once(program.clone())
            .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");
        trace!(%command, "running bridge command");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: program.clone(),
                source,
            })?;

        let waited = time::timeout(self.config.command_timeout, child.wait_with_output()).await;
        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(BridgeError::Spawn { program, source }),
            Err(_) => {
                return Err(BridgeError::Timeout {
                    command,
                    timeout: self.config.command_timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BridgeError::Exit {
                command,
                status: output.status,
                stdout,
                stderr,
            });
        }
        debug!(%command, bytes = stdout.len(), "bridge command finished");
        Ok(stdout)
    }
}

#[async_trait]
impl DeviceBridge for AdbBridge {
    async fn connect(&self, endpoint: &str) -> Result<String, BridgeError> {
        self.run(["connect", endpoint]).await
    }

    async fn devices(&self) -> Result<String, BridgeError> {
        self.run(["devices"]).await
    }

    async fn install(&self, package: &Path) -> Result<String, BridgeError> {
        self.run([std::ffi::OsStr::new("install"), package.as_os_str()])
            .await
    }

    async fn disconnect(&self, target: &str) -> Result<String, BridgeError> {
        self.run(["disconnect", target]).await
    }
}

/// Whether `connect` output reports a live connection.
///
/// `adb` answers `connected to …` or `already connected to …` on success and
/// `failed to connect to …` / `cannot connect to …` otherwise.
pub fn is_connect_success(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    if !lower.contains("connected") {
        return false;
    }
    !["cannot connect", "failed to connect", "unable to connect"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Find the entry for `address` in `devices` output.
///
/// Matches lines whose serial is `address` or `address:port` and whose state
/// is `device` (so `offline` and `unauthorized` entries are skipped). Best
/// effort only.
pub fn find_connected(devices_output: &str, address: IpAddr) -> Option<ConnectedDevice> {
    let address = address.to_string();
    devices_output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let serial = fields.next()?;
        let state = fields.next()?;
        if state != "device" {
            return None;
        }
        let port = if serial == address {
            None
        } else {
            let rest = serial.strip_prefix(address.as_str())?.strip_prefix(':')?;
            Some(rest.parse::<u16>().ok()?)
        };
        Some(ConnectedDevice {
            serial: serial.to_string(),
            port,
        })
    })
}

/// Argument for `disconnect`: `address:port` if the port is known, else the bare address.
pub fn disconnect_target(address: IpAddr, port: Option<u16>) -> String {
    match port {
        Some(port) => endpoint(address, port),
        None => address.to_string(),
    }
}

/// `address:port` as the bridge expects it.
pub fn endpoint(address: IpAddr, port: u16) -> String {
    match address {
        IpAddr::V4(_) => format!("{address}:{port}"),
        IpAddr::V6(_) => format!("[{address}]:{port}"),
    }
}
