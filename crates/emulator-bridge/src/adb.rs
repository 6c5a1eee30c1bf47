//! ADB Proxy
//!
//! A thin abstraction for short-lived adb invocations whose output the
//! pipeline consumes directly. Long-running adb calls that must stay
//! cancellable go through [`crate::boot`] instead.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// ADB invocation errors
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("adb exited with {0}")]
    CommandFailed(std::process::ExitStatus),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs adb synchronously with the shared environment overlay
pub struct AdbProxy {
    adb: PathBuf,
    env: HashMap<String, String>,
}

impl AdbProxy {
    pub fn new(adb: PathBuf, env: HashMap<String, String>) -> Self {
        Self { adb, env }
    }

    /// Invoke adb with the given arguments and return its stdout lines,
    /// trimmed of surrounding whitespace (which strips the carriage
    /// returns Windows adds). Standard error is discarded.
    pub async fn execute(&self, args: &[&str]) -> Result<Vec<String>, AdbError> {
        debug!("adb {:?}", args);

        let output = Command::new(&self.adb)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(AdbError::CommandFailed(output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("adb stdout: {}", stdout);
        Ok(stdout.lines().map(|line| line.trim().to_string()).collect())
    }

    /// The `devices` listing used for port negotiation
    pub async fn devices(&self) -> Result<Vec<String>, AdbError> {
        self.execute(&["devices"]).await
    }
}
