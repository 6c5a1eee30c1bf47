//! Droidharness - Android emulator lifecycle harness for CI pipelines
//!
//! Resolves SDK tooling, negotiates a console port, launches the emulator,
//! waits for boot completion, and tears everything down again.

pub mod pipeline;

// Re-export crates
pub use droidharness_core as core;
pub use droidharness_emulator_bridge as emulator_bridge;
pub use droidharness_toolchain as toolchain;

pub use pipeline::EmulatorPipeline;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
