//! Droidharness - Android emulator lifecycle harness for CI pipelines
//!
//! Boots an emulator instance, waits until the guest accepts commands,
//! runs the workload, and guarantees teardown.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use droidharness::EmulatorPipeline;
use droidharness_core::HarnessConfig;

/// Android emulator lifecycle harness for CI pipelines
#[derive(Parser, Debug)]
#[command(name = "droidharness")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the harness configuration file
    #[arg(short, long, default_value = "droidharness.toml")]
    config: PathBuf,

    /// Override the AVD name from the configuration
    #[arg(long)]
    avd: Option<String>,

    /// Boot an existing device definition instead of creating one
    #[arg(long)]
    no_create: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workload to run against the booted instance
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    workload: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("droidharness v{} starting", droidharness::VERSION);

    match run(cli).await {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = HarnessConfig::load(&cli.config).await?;
    if let Some(avd) = cli.avd {
        config.emulator.name = Some(avd);
    }

    let pipeline = EmulatorPipeline::prepare(config)?;
    pipeline.run(!cli.no_create, &cli.workload).await
}
