//! AVD Creation
//!
//! Creates the virtual device definition a launch will boot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// AVD creation errors
#[derive(Debug, Error)]
pub enum AvdError {
    #[error("failed to create AVD {name}: {stderr}")]
    CreateFailed { name: String, stderr: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates AVDs through avdmanager with the shared environment overlay
pub struct AvdCreator {
    avdmanager: PathBuf,
    env: HashMap<String, String>,
}

impl AvdCreator {
    pub fn new(avdmanager: PathBuf, env: HashMap<String, String>) -> Self {
        Self { avdmanager, env }
    }

    /// Create (or overwrite) the named AVD from a system image package.
    /// avdmanager asks whether to build a custom hardware profile; a piped
    /// "no" declines it.
    pub async fn create(
        &self,
        name: &str,
        package: &str,
        device: Option<&str>,
    ) -> Result<(), AvdError> {
        info!("Creating AVD {} from {}", name, package);

        let mut cmd = Command::new(&self.avdmanager);
        cmd.args(["create", "avd", "--name", name, "--package", package, "--force"]);
        if let Some(device) = device {
            cmd.args(["--device", device]);
        }
        cmd.envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("avdmanager create avd --name {} --package {}", name, package);
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // The prompt is not reached on every code path; a closed pipe
            // is fine.
            let _ = stdin.write_all(b"no\n").await;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AvdError::CreateFailed {
                name: name.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        info!("AVD {} created", name);
        Ok(())
    }
}
