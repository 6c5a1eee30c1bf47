//! SDK Tool Resolution
//!
//! Locates command-line tooling inside an installed Android SDK:
//! - dotted version ordering for revision directories
//! - prioritized candidate-path resolution with wildcard segments
//! - the environment overlay shared by every tool invocation

pub mod env;
pub mod locator;
pub mod version;

pub use env::tool_environment;
pub use locator::{ensure_executable, LocatorError, SdkLayout};
