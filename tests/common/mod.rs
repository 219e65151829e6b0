#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use adb_port_finder::bridge::DeviceBridge;
use adb_port_finder::error::BridgeError;
use adb_port_finder::session::Prompter;
use async_trait::async_trait;
use tokio::net::TcpListener;

/// Bridge double that confirms only `accept` ports and records every call.
#[derive(Default)]
pub struct FakeBridge {
    pub accept: HashSet<u16>,
    pub devices_output: String,
    pub fail_connect: bool,
    pub fail_devices: bool,
    pub fail_install: bool,
    pub fail_disconnect: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBridge {
    pub fn accepting(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            accept: ports.into_iter().collect(),
            devices_output: "List of devices attached\n".to_string(),
            ..Self::default()
        }
    }

    pub fn rejecting_all() -> Self {
        Self::accepting(Vec::new())
    }

    pub fn with_devices(mut self, output: &str) -> Self {
        self.devices_output = output.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn tool_error(command: String) -> BridgeError {
        BridgeError::Timeout {
            command,
            timeout: Duration::from_secs(1),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DeviceBridge for FakeBridge {
    async fn connect(&self, endpoint: &str) -> Result<String, BridgeError> {
        self.record(format!("connect {endpoint}"));
        if self.fail_connect {
            return Err(Self::tool_error(format!("adb connect {endpoint}")));
        }
        let port: u16 = endpoint
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap();
        if self.accept.contains(&port) {
            Ok(format!("connected to {endpoint}"))
        } else {
            Ok(format!(
                "failed to connect to '{endpoint}': Connection refused"
            ))
        }
    }

    async fn devices(&self) -> Result<String, BridgeError> {
        self.record("devices".to_string());
        if self.fail_devices {
            return Err(Self::tool_error("adb devices".to_string()));
        }
        Ok(self.devices_output.clone())
    }

    async fn install(&self, package: &Path) -> Result<String, BridgeError> {
        self.record(format!("install {}", package.display()));
        if self.fail_install {
            return Err(Self::tool_error(format!("adb install {}", package.display())));
        }
        Ok("Performing Streamed Install\nSuccess".to_string())
    }

    async fn disconnect(&self, target: &str) -> Result<String, BridgeError> {
        self.record(format!("disconnect {target}"));
        if self.fail_disconnect {
            return Err(Self::tool_error(format!("adb disconnect {target}")));
        }
        Ok(format!("disconnected {target}"))
    }
}

/// Prompter that replays canned answers and remembers what it was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }
}

/// Bind `n` listeners on consecutive localhost ports.
pub async fn bind_adjacent(n: u16) -> Vec<TcpListener> {
    for _ in 0..100 {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = first.local_addr().unwrap().port();
        if base.checked_add(n - 1).is_none() {
            continue;
        }
        let mut listeners = vec![first];
        for offset in 1..n {
            match TcpListener::bind(("127.0.0.1", base + offset)).await {
                Ok(l) => listeners.push(l),
                Err(_) => break,
            }
        }
        if listeners.len() == n as usize {
            return listeners;
        }
    }
    panic!("could not bind {n} adjacent ports");
}

/// A localhost port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn port_of(listener: &TcpListener) -> u16 {
    listener.local_addr().unwrap().port()
}
