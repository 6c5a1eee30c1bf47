//! Pipeline Configuration
//!
//! Settings for a single emulator lifecycle run: SDK and AVD locations,
//! the virtual device identity, and launch behavior.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// Virtual device and launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorSettings {
    /// Instance name; derived from the image identity when unset
    pub name: Option<String>,
    /// Android API level of the system image
    pub api_level: u32,
    /// System image ABI (x86_64, arm64-v8a, ...)
    pub abi: String,
    /// Use the google_apis image flavor instead of default
    pub google_apis: bool,
    /// Run without window, audio, or skin
    pub headless: bool,
    /// Relay emulator stdout/stderr into the pipeline log
    pub log_output: bool,
    /// Upper bound for the boot readiness wait, in seconds
    pub boot_timeout_secs: u64,
    /// Extra flags passed through to the emulator unvalidated
    pub additional_args: Vec<String>,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            name: None,
            api_level: 30,
            abi: "x86_64".to_string(),
            google_apis: false,
            headless: true,
            log_output: false,
            boot_timeout_secs: 360,
            additional_args: Vec::new(),
        }
    }
}

impl EmulatorSettings {
    /// System image flavor selected by the Google APIs toggle
    pub fn flavor(&self) -> &'static str {
        if self.google_apis {
            "google_apis"
        } else {
            "default"
        }
    }

    /// Platform directory name, e.g. "android-30"
    pub fn android_version(&self) -> String {
        format!("android-{}", self.api_level)
    }

    /// Full system image package name for avdmanager,
    /// e.g. "system-images;android-30;default;x86_64"
    pub fn system_image_package(&self) -> String {
        format!(
            "system-images;{};{};{}",
            self.android_version(),
            self.flavor(),
            self.abi
        )
    }

    /// Instance name, derived from the image identity when not set explicitly
    pub fn instance_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!(
                "generated-{}_{}-{}",
                self.android_version(),
                self.abi,
                self.flavor()
            )
        })
    }

    /// Flags appended to the emulator command line: the headless expansion
    /// followed by the pass-through list
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("-no-skin".to_string());
            args.push("-no-audio".to_string());
            args.push("-no-window".to_string());
        }
        args.extend(self.additional_args.iter().cloned());
        args
    }
}

/// Main harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Android SDK root; falls back to environment variables and
    /// well-known install locations when unset
    pub sdk_root: Option<PathBuf>,
    /// Per-run AVD data directory; defaults to ./android-avd-root
    pub avd_root: Option<PathBuf>,
    /// Virtual device settings
    pub emulator: EmulatorSettings,
}

impl HarnessConfig {
    /// Load configuration from a toml file, or defaults if it does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            let config: HarnessConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Ok(HarnessConfig::default())
        }
    }

    /// Save configuration to a toml file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Resolve the SDK root: explicit setting, then ANDROID_SDK_ROOT and
    /// ANDROID_HOME, then well-known install locations
    pub fn resolve_sdk_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.sdk_root {
            return Ok(root.clone());
        }

        for var in ["ANDROID_SDK_ROOT", "ANDROID_HOME"] {
            if let Some(root) = std::env::var_os(var) {
                return Ok(PathBuf::from(root));
            }
        }

        let candidates = if cfg!(windows) {
            vec![
                dirs::config_local_dir().map(|d| d.join("Android").join("Sdk")),
                Some(PathBuf::from("C:\\Android\\sdk")),
            ]
        } else {
            vec![
                dirs::home_dir().map(|h: PathBuf| h.join("Android").join("Sdk")),
                Some(PathBuf::from("/usr/local/android-sdk")),
            ]
        };

        candidates
            .into_iter()
            .flatten()
            .find(|p: &PathBuf| p.exists())
            .ok_or_else(|| {
                HarnessError::AndroidSdk(
                    "no SDK root configured and none found in the environment".to_string(),
                )
            })
    }

    /// Resolve the AVD data directory for this run
    pub fn resolve_avd_root(&self) -> PathBuf {
        if let Some(ref root) = self.avd_root {
            return root.clone();
        }
        match std::env::current_dir() {
            Ok(dir) => dir.join("android-avd-root"),
            Err(_) => PathBuf::from("android-avd-root"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EmulatorSettings::default();
        assert_eq!(settings.flavor(), "default");
        assert!(settings.headless);
        assert!(!settings.log_output);
    }

    #[test]
    fn test_derived_identity() {
        let settings = EmulatorSettings {
            api_level: 30,
            abi: "x86_64".to_string(),
            google_apis: true,
            ..Default::default()
        };
        assert_eq!(
            settings.system_image_package(),
            "system-images;android-30;google_apis;x86_64"
        );
        assert_eq!(settings.instance_name(), "generated-android-30_x86_64-google_apis");
    }

    #[test]
    fn test_name_override() {
        let settings = EmulatorSettings {
            name: Some("ci-device".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.instance_name(), "ci-device");
    }

    #[test]
    fn test_headless_launch_args() {
        let mut settings = EmulatorSettings {
            additional_args: vec!["-gpu".to_string(), "swiftshader_indirect".to_string()],
            ..Default::default()
        };
        assert_eq!(
            settings.launch_args(),
            vec!["-no-skin", "-no-audio", "-no-window", "-gpu", "swiftshader_indirect"]
        );

        settings.headless = false;
        assert_eq!(settings.launch_args(), vec!["-gpu", "swiftshader_indirect"]);
    }
}
