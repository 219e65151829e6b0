//! Interactive session: reuse or find a connection, then install or disconnect.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::bridge::{self, DeviceBridge};
use crate::config::ScanConfig;
use crate::console;
use crate::error::{ScanError, SessionError};
use crate::scanner::{self, ScanProgress};
use crate::types::{ConnectedDevice, Connection, ScanOutcome};

pub const RETRY_PROMPT: &str = "Would you like to retry? (y/n): ";
pub const MENU_PROMPT: &str = "Enter your choice (1 or 2): ";
pub const PATH_PROMPT: &str = "Enter the path to the APK file for installation: ";

/// Source of the user's answers. `None` means input is exhausted.
#[async_trait]
pub trait Prompter: Send {
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Choice made at the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Install,
    Disconnect,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Install),
            "2" => Some(MenuChoice::Disconnect),
            _ => None,
        }
    }
}

pub struct Session<P> {
    config: ScanConfig,
    bridge: Arc<dyn DeviceBridge>,
    prompter: P,
    show_progress: bool,
}

impl<P: Prompter> Session<P> {
    pub fn new(config: ScanConfig, bridge: Arc<dyn DeviceBridge>, prompter: P) -> Self {
        Self {
            config,
            bridge,
            prompter,
            show_progress: false,
        }
    }

    /// Render a progress bar while scanning.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Run the whole interactive flow until the user disconnects, aborts, or input ends.
    pub async fn run(&mut self) -> Result<()> {
        console::clear_console();
        console::print_banner();

        let Some(conn) = self.establish().await? else {
            console::print_section("Error", "Could not find open port", false);
            return Ok(());
        };

        console::print_success(&format!(
            "Successfully connected to {}:{}",
            conn.address,
            conn.port.map_or_else(|| "N/A".to_string(), |p| p.to_string())
        ));
        console::print_section("Connection Result", &conn.detail, true);

        self.menu(&conn).await
    }

    /// Reuse an existing connection or scan for one, asking before each retry.
    ///
    /// Returns `None` when the user declines to retry.
    pub async fn establish(&mut self) -> Result<Option<Connection>> {
        let address = self.config.address;
        if let Some(device) = self.check_existing().await {
            let port = device.port;
            let detail = match port {
                Some(p) => format!("Device already connected at {address}:{p}"),
                None => format!("Device already connected at {address}"),
            };
            info!(serial = %device.serial, "device already connected, skipping scan");
            return Ok(Some(Connection {
                address,
                port,
                detail,
                already_connected: true,
            }));
        }

        info!(%address, "starting to find the ADB port");
        loop {
            let message = match self.scan_once().await {
                Ok(ScanOutcome::Found(found)) => {
                    return Ok(Some(Connection {
                        address,
                        port: Some(found.port),
                        detail: found.detail,
                        already_connected: false,
                    }));
                }
                Ok(ScanOutcome::NotFound) => "Could not find open port".to_string(),
                Err(e) => {
                    warn!(error = %e, "scan failed");
                    format!("Scan failed: {e}")
                }
            };
            console::print_error(&message);

            let answer = self.prompter.ask(RETRY_PROMPT).await?;
            let retry = answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y"));
            if !retry {
                return Ok(None);
            }
        }
    }

    /// Look for the target address in the bridge's device list.
    pub async fn check_existing(&self) -> Option<ConnectedDevice> {
        match self.bridge.devices().await {
            Ok(output) => bridge::find_connected(&output, self.config.address),
            Err(e) => {
                warn!(error = %e, "could not list devices, assuming not connected");
                None
            }
        }
    }

    /// Install the package at `path`. The bridge is not called if the path does not exist.
    pub async fn install_package(&self, path: &Path) -> Result<String, SessionError> {
        if !path.exists() {
            return Err(SessionError::PathNotFound(path.to_path_buf()));
        }
        info!(path = %path.display(), "installing APK");
        Ok(self.bridge.install(path).await?)
    }

    /// Disconnect from `address:port`, or from the bare address when the port is unknown.
    pub async fn disconnect(&self, port: Option<u16>) -> Result<String, SessionError> {
        let target = bridge::disconnect_target(self.config.address, port);
        info!(%target, "disconnecting");
        Ok(self.bridge.disconnect(&target).await?)
    }

    async fn scan_once(&self) -> Result<ScanOutcome, ScanError> {
        if !self.show_progress {
            return scanner::find_open_port(&self.config, self.bridge.clone()).await;
        }
        let progress = ScanProgress::new();
        let display = console::ProgressDisplay::start(progress.clone());
        let outcome =
            scanner::find_open_port_with_progress(&self.config, self.bridge.clone(), progress)
                .await;
        display.finish();
        outcome
    }

    async fn menu(&mut self, conn: &Connection) -> Result<()> {
        loop {
            console::print_menu();
            let Some(answer) = self.prompter.ask(MENU_PROMPT).await? else {
                return Ok(());
            };

            match MenuChoice::parse(&answer) {
                Some(MenuChoice::Install) => {
                    let Some(raw) = self.prompter.ask(PATH_PROMPT).await? else {
                        return Ok(());
                    };
                    let path = clean_path_input(&raw);
                    let (body, ok) = render(self.install_package(Path::new(path)).await);
                    console::print_section("APK Installation Result", &body, ok);
                }
                Some(MenuChoice::Disconnect) => {
                    let (body, ok) = render(self.disconnect(conn.port).await);
                    console::print_section("ADB Disconnect Result", &body, ok);
                    return Ok(());
                }
                None => console::print_error(
                    "Invalid choice. Please enter '1' for Install APK file or '2' for Disconnect ADB.",
                ),
            }
        }
    }
}

fn render(result: Result<String, SessionError>) -> (String, bool) {
    match result {
        Ok(output) => (output, true),
        Err(e @ SessionError::PathNotFound(_)) => (e.to_string(), false),
        Err(e) => {
            warn!(error = %e, "bridge command failed");
            (e.to_string(), false)
        }
    }
}

/// Trim whitespace and the quotes terminals add around dragged-in paths.
fn clean_path_input(raw: &str) -> &str {
    let s = raw.trim();
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}
