//! Emulator Process Launcher
//!
//! Starts the emulator bound to a negotiated port and supervises it with
//! background relay and exit-watcher tasks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use crate::handle::LaunchHandle;
use crate::port::InstanceId;
use crate::terminate;

/// Launch errors
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("emulator failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("emulator process exited before it could be supervised")]
    NoPid,
}

/// Launches and supervises one emulator process
pub struct EmulatorLauncher {
    emulator_exe: PathBuf,
    instance_name: String,
    launch_args: Vec<String>,
    env: HashMap<String, String>,
    relay_output: bool,
}

impl EmulatorLauncher {
    pub fn new(
        emulator_exe: PathBuf,
        instance_name: String,
        launch_args: Vec<String>,
        env: HashMap<String, String>,
        relay_output: bool,
    ) -> Self {
        Self {
            emulator_exe,
            instance_name,
            launch_args,
            env,
            relay_output,
        }
    }

    /// Command line for one launch: the instance, attached-shell mode so
    /// the process stays supervisable instead of detaching, the negotiated
    /// port, then the pass-through flags.
    fn build_args(&self, id: InstanceId) -> Vec<String> {
        let mut args = vec![
            format!("@{}", self.instance_name),
            "-shell".to_string(),
            "-port".to_string(),
            id.port().to_string(),
        ];
        args.extend(self.launch_args.iter().cloned());
        args
    }

    /// Spawn the emulator and its supervision tasks.
    ///
    /// The pid lands in `handle` before this returns; the exit watcher
    /// owns the child from here on. Must be called after the instance id
    /// was negotiated and recorded, since the id is a startup argument.
    pub fn launch(&self, id: InstanceId, handle: Arc<LaunchHandle>) -> Result<(), LaunchError> {
        let args = self.build_args(id);

        let mut command = Command::new(&self.emulator_exe);
        command.args(&args).envs(&self.env);
        if self.relay_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        debug!("Starting emulator: {:?} {:?}", self.emulator_exe, args);
        let mut child = command.spawn().map_err(LaunchError::Spawn)?;
        let pid = child.id().ok_or(LaunchError::NoPid)?;
        handle.bind_emulator(pid);
        info!("Emulator {} started as pid {}", id, pid);

        if self.relay_output {
            relay_output(&mut child);
        }
        spawn_exit_watcher(child, handle);
        Ok(())
    }
}

/// Forward each line of the child's output streams into the pipeline log.
/// Each reader runs until its stream closes with the process; a closed
/// stream ends the loop without being treated as a failure.
fn relay_output(child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("[emulator stdout] {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("[emulator stderr] {}", line);
            }
        });
    }
}

/// Block on process exit in the background. An abnormal exit cancels any
/// in-flight readiness poll through the shared handle, so the pipeline
/// does not keep waiting for a device that will never boot. The exit
/// itself is reported as a warning only; downstream steps fail on their
/// own once the device is gone.
fn spawn_exit_watcher(mut child: Child, handle: Arc<LaunchHandle>) {
    tokio::spawn(async move {
        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Interrupted while watching emulator process: {}", e);
                return;
            }
        };
        if !status.success() {
            error!("Emulator exited abnormally with {}", status);
            terminate::cancel_boot_wait(&handle);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_binds_the_negotiated_port() {
        let launcher = EmulatorLauncher::new(
            PathBuf::from("/sdk/emulator/emulator"),
            "ci-device".to_string(),
            vec!["-no-window".to_string()],
            HashMap::new(),
            false,
        );
        let args = launcher.build_args(InstanceId::new(5584));
        assert_eq!(args, vec!["@ci-device", "-shell", "-port", "5584", "-no-window"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_failure_surfaces_spawn_error() {
        let launcher = EmulatorLauncher::new(
            PathBuf::from("/nonexistent/emulator"),
            "ci-device".to_string(),
            Vec::new(),
            HashMap::new(),
            false,
        );
        let handle = Arc::new(LaunchHandle::new());
        let result = launcher.launch(InstanceId::new(5584), Arc::clone(&handle));
        assert!(matches!(result, Err(LaunchError::Spawn(_))));
        assert_eq!(handle.emulator_pid(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abnormal_exit_cancels_readiness_poll() {
        // Stand-ins: a waiter that would block forever and an "emulator"
        // that dies immediately with a non-zero status.
        let waiter = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let handle = Arc::new(LaunchHandle::new());
        handle.bind_boot_waiter(waiter.id());

        let launcher = EmulatorLauncher::new(
            PathBuf::from("/bin/false"),
            "ci-device".to_string(),
            Vec::new(),
            HashMap::new(),
            false,
        );
        launcher.launch(InstanceId::new(5584), Arc::clone(&handle)).unwrap();

        // The watcher should take and kill the waiter once /bin/false exits.
        let mut waiter = waiter;
        for _ in 0..50 {
            if handle.boot_waiter_pid().is_none() && waiter.try_wait().unwrap().is_some() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        let _ = waiter.kill();
        panic!("readiness poll was not cancelled after abnormal emulator exit");
    }
}
