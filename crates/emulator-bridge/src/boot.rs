//! Boot Readiness Polling
//!
//! Blocks until the negotiated instance reports that its boot sequence
//! has completed, or the detection window closes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::handle::LaunchHandle;
use crate::port::InstanceId;

/// Remote busy-wait on the boot-completion property; exits zero once set
const BOOT_COMPLETED_LOOP: &str =
    "while $(exit $(getprop sys.boot_completed)) ; do sleep 1; done;";

/// Readiness errors
#[derive(Debug, Error)]
pub enum BootError {
    #[error("instance did not become ready within {0} seconds")]
    Timeout(u64),
    #[error("readiness poll aborted with {0}")]
    Aborted(std::process::ExitStatus),
    #[error("unable to wait for emulator: {0}")]
    Io(#[from] std::io::Error),
}

/// Polls one specific instance for boot completion
pub struct BootWaiter {
    adb_exe: PathBuf,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl BootWaiter {
    pub fn new(adb_exe: PathBuf, env: HashMap<String, String>, timeout: Duration) -> Self {
        Self {
            adb_exe,
            env,
            timeout,
        }
    }

    /// Arguments targeting the specific negotiated instance, never "any"
    /// attached device: first wait for the serial to become visible to
    /// adb, then run the remote boot-completion loop on it.
    fn build_args(&self, id: InstanceId) -> Vec<String> {
        vec![
            "-s".to_string(),
            id.serial(),
            "wait-for-device".to_string(),
            "shell".to_string(),
            BOOT_COMPLETED_LOOP.to_string(),
        ]
    }

    /// Block until the instance reports boot completion.
    ///
    /// Runs as its own subprocess rather than through the AdbProxy so that
    /// the exit watcher can cancel it when the emulator dies first. The
    /// subprocess pid is published through `handle` for exactly that
    /// purpose; a cancellation surfaces here as an aborted exit status.
    pub async fn wait_for_boot(
        &self,
        id: InstanceId,
        handle: &LaunchHandle,
    ) -> Result<(), BootError> {
        let args = self.build_args(id);
        debug!("Waiting for {} to finish booting", id);

        let mut child = Command::new(&self.adb_exe)
            .args(&args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .spawn()?;
        if let Some(pid) = child.id() {
            handle.bind_boot_waiter(pid);
        }

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        handle.take_boot_waiter();

        match waited {
            Err(_) => {
                warn!("Instance {} still not ready, giving up", id);
                let _ = child.kill().await;
                Err(BootError::Timeout(self.timeout.as_secs()))
            }
            Ok(Ok(status)) if status.success() => {
                info!("Instance {} reported boot completed", id);
                Ok(())
            }
            Ok(Ok(status)) => {
                warn!("Readiness poll for {} exited with {}", id, status);
                Err(BootError::Aborted(status))
            }
            Ok(Err(e)) => Err(BootError::Io(e)),
        }
    }
}
