//! Lifecycle Pipeline
//!
//! The sequential control flow of one emulator run: resolve tools,
//! negotiate an identifier, launch, wait for boot, run the workload, and
//! terminate, with a best-effort guard for abnormal pipeline exits.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use droidharness_core::HarnessConfig;
use droidharness_emulator_bridge::{
    port, terminate, AdbProxy, AvdCreator, BootWaiter, EmulatorLauncher, InstanceId, LaunchHandle,
};
use droidharness_toolchain::{ensure_executable, tool_environment, SdkLayout};

/// Drives one emulator instance from tool resolution to teardown
pub struct EmulatorPipeline {
    config: HarnessConfig,
    emulator_exe: PathBuf,
    adb_exe: PathBuf,
    avdmanager_exe: PathBuf,
    env: HashMap<String, String>,
    adb: AdbProxy,
    handle: Arc<LaunchHandle>,
    instance: Option<InstanceId>,
}

impl EmulatorPipeline {
    /// Resolve tooling and the shared environment for one run. Fails before
    /// any process exists, so no cleanup is needed on this path.
    pub fn prepare(config: HarnessConfig) -> Result<Self> {
        let sdk_root = config.resolve_sdk_root().context("resolving SDK root")?;
        let avd_root = config.resolve_avd_root();
        let layout = SdkLayout::new(&sdk_root)?;

        let emulator_exe = layout.emulator()?;
        let adb_exe = layout.adb()?;
        let avdmanager_exe = layout.avdmanager()?;
        for tool in [&emulator_exe, &adb_exe, &avdmanager_exe] {
            ensure_executable(tool)?;
        }

        let env = tool_environment(&sdk_root, &avd_root);
        let adb = AdbProxy::new(adb_exe.clone(), env.clone());

        info!("Using SDK at {:?}, device data in {:?}", sdk_root, avd_root);
        Ok(Self {
            config,
            emulator_exe,
            adb_exe,
            avdmanager_exe,
            env,
            adb,
            handle: Arc::new(LaunchHandle::new()),
            instance: None,
        })
    }

    /// Create the AVD this run will boot
    pub async fn create_avd(&self) -> Result<()> {
        let creator = AvdCreator::new(self.avdmanager_exe.clone(), self.env.clone());
        let settings = &self.config.emulator;
        creator
            .create(
                &settings.instance_name(),
                &settings.system_image_package(),
                None,
            )
            .await?;
        Ok(())
    }

    /// Negotiate an instance identifier and launch the emulator against it
    pub async fn start(&mut self) -> Result<InstanceId> {
        // The identifier is fixed before launch: it is a startup argument,
        // and the boot wait targets it specifically rather than whichever
        // instance happens to come up first.
        let id = port::negotiate(&self.adb).await?;
        self.instance = Some(id);

        let settings = &self.config.emulator;
        let launcher = EmulatorLauncher::new(
            self.emulator_exe.clone(),
            settings.instance_name(),
            settings.launch_args(),
            self.env.clone(),
            settings.log_output,
        );
        launcher.launch(id, Arc::clone(&self.handle))?;
        Ok(id)
    }

    /// Block until the launched instance reports boot completion
    pub async fn wait_for_boot(&self) -> Result<()> {
        let id = self.instance.context("emulator was not started")?;
        let waiter = BootWaiter::new(
            self.adb_exe.clone(),
            self.env.clone(),
            Duration::from_secs(self.config.emulator.boot_timeout_secs),
        );
        waiter.wait_for_boot(id, &self.handle).await?;
        Ok(())
    }

    /// Run the workload command against the booted instance, with
    /// ANDROID_SERIAL pinned to the negotiated serial
    pub async fn run_workload(&self, command: &[String]) -> Result<std::process::ExitStatus> {
        let id = self.instance.context("emulator was not started")?;
        let (program, args) = command.split_first().context("empty workload command")?;
        info!("Running workload {:?} against {}", program, id);

        let status = tokio::process::Command::new(program)
            .args(args)
            .envs(&self.env)
            .env("ANDROID_SERIAL", id.serial())
            .status()
            .await
            .with_context(|| format!("spawning workload command {:?}", program))?;
        Ok(status)
    }

    /// Stop the emulator and its descendants; safe to call at any point
    /// and any number of times
    pub async fn shutdown(&self) {
        let handle = Arc::clone(&self.handle);
        let done = tokio::task::spawn_blocking(move || terminate::terminate(&handle)).await;
        if let Err(e) = done {
            warn!("Termination task failed: {}", e);
        }
    }

    /// Arrange for the same idempotent termination to run when the host
    /// pipeline is interrupted. The guard thread stays dormant until a
    /// signal arrives.
    pub fn install_shutdown_guard(&self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let handle = Arc::clone(&self.handle);
        let mut signals = Signals::new([SIGINT, SIGTERM]).context("registering signal handlers")?;
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                warn!("Received signal {}, stopping emulator", signal);
                terminate::terminate(&handle);
                std::process::exit(128 + signal);
            }
        });
        Ok(())
    }

    /// The full lifecycle. Launch and readiness failures still run
    /// termination before propagating so no process leaks; termination
    /// failures are logged, never raised.
    pub async fn run(mut self, create_avd: bool, workload: &[String]) -> Result<i32> {
        self.install_shutdown_guard()?;
        if create_avd {
            self.create_avd().await?;
        }

        let outcome = self.boot_and_work(workload).await;
        self.shutdown().await;
        outcome
    }

    async fn boot_and_work(&mut self, workload: &[String]) -> Result<i32> {
        let id = self.start().await?;
        self.wait_for_boot().await?;
        info!("Instance {} is ready", id);

        if workload.is_empty() {
            return Ok(0);
        }
        let status = self.run_workload(workload).await?;
        if !status.success() {
            warn!("Workload exited with {}", status);
        }
        Ok(status.code().unwrap_or(1))
    }
}
