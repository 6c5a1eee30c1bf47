//! Droidharness Core - configuration and shared types
//!
//! This crate provides the configuration surface and error types shared by
//! the toolchain and emulator-bridge crates.

pub mod config;
pub mod error;

pub use config::{EmulatorSettings, HarnessConfig};
pub use error::{HarnessError, Result};

/// Droidharness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droidharness";
