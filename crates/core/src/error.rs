//! Error types for droidharness
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for droidharness configuration and shared plumbing
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Android SDK error: {0}")]
    AndroidSdk(String),
}

/// Result type alias for droidharness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
