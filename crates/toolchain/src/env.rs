//! Tool Invocation Environment
//!
//! Builds the fixed environment overlay applied to every spawned process
//! so that tool invocations, the emulator, and the readiness poll all
//! agree on where persistent device state lives.

use std::collections::HashMap;
use std::path::Path;

/// The three-variable overlay: ANDROID_SDK_ROOT and ANDROID_HOME point at
/// the SDK root, ANDROID_AVD_HOME at the per-run device data directory.
pub fn tool_environment(sdk_root: &Path, avd_root: &Path) -> HashMap<String, String> {
    let sdk = sdk_root.to_string_lossy().to_string();
    let mut env = HashMap::new();
    env.insert("ANDROID_SDK_ROOT".to_string(), sdk.clone());
    env.insert("ANDROID_HOME".to_string(), sdk);
    env.insert(
        "ANDROID_AVD_HOME".to_string(),
        avd_root.to_string_lossy().to_string(),
    );
    env
}
