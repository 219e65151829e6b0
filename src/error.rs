//! Error types for scanning and the device session

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures invoking the external bridge tool
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The tool could not be started at all
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited unsuccessfully; both streams are kept
    #[error("`{command}` exited with {status}: {}", join_streams(.stdout, .stderr))]
    Exit {
        command: String,
        status: std::process::ExitStatus,
        stdout: String,
        stderr: String,
    },

    /// The tool did not finish in time and was killed
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn join_streams(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("{stdout}\n{stderr}"),
        (false, true) => stdout.to_string(),
        _ => stderr.to_string(),
    }
}

/// Failures that abort a scan, as opposed to a scan that simply found nothing
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("probe task failed: {0}")]
    ProbeTask(#[from] tokio::task::JoinError),
}

/// Failures of the install/disconnect actions
#[derive(Debug, Error)]
pub enum SessionError {
    /// The package path given by the user does not exist
    #[error("APK file not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
