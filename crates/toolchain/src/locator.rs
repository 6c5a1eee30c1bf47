//! SDK Tool Resolution
//!
//! Resolves command-line tool executables under an SDK root whose layout
//! may contain version-numbered directories.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::version;

/// Folders that may contain sdkmanager or avdmanager, relative to the SDK
/// root. A `None` segment selects the highest-versioned subdirectory
/// present at that position. Earlier entries are preferred over later ones.
const CMDLINE_TOOL_CANDIDATES: &[&[Option<&str>]] = &[
    // cmdline-tools downloaded separately and copied into the SDK root
    &[Some("cmdline-tools"), Some("tools"), Some("bin")],
    // cmdline-tools;latest installed via sdkmanager
    &[Some("cmdline-tools"), Some("latest"), Some("bin")],
    // a specific cmdline-tools version installed via sdkmanager
    &[Some("cmdline-tools"), None, Some("bin")],
    // the legacy sdk tools
    &[Some("tools"), Some("bin")],
];

/// Tool resolution errors
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("SDK root {0:?} does not exist")]
    MissingRoot(PathBuf),
    #[error("unable to find a usable {0} under the SDK root")]
    ToolNotFound(&'static str),
    #[error("unable to make {0:?} executable")]
    NotExecutable(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Script tool file name with the platform suffix applied
fn script_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.bat", name)
    } else {
        name.to_string()
    }
}

/// Native tool file name with the platform suffix applied
fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Resolves tool executables relative to an installed SDK root
pub struct SdkLayout {
    sdk_root: PathBuf,
}

impl SdkLayout {
    /// Create a layout over an SDK root, which must exist
    pub fn new(sdk_root: impl Into<PathBuf>) -> Result<Self, LocatorError> {
        let sdk_root = sdk_root.into();
        if !sdk_root.is_dir() {
            return Err(LocatorError::MissingRoot(sdk_root));
        }
        Ok(Self { sdk_root })
    }

    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Walk one candidate path. Literal segments descend into that
    /// subdirectory; a wildcard segment selects the highest-versioned
    /// child. Any failure along the walk fails the whole candidate.
    fn walk(&self, segments: &[Option<&str>]) -> Option<PathBuf> {
        let mut dir = self.sdk_root.clone();
        for segment in segments {
            match segment {
                Some(name) => {
                    dir.push(name);
                    if !dir.is_dir() {
                        return None;
                    }
                }
                None => {
                    dir = highest_versioned_child(&dir)?;
                }
            }
        }
        Some(dir)
    }

    /// Resolve a script tool through the candidate list, in priority order
    fn find_script_tool(&self, tool: &'static str) -> Result<PathBuf, LocatorError> {
        let file_name = script_name(tool);
        for candidate in CMDLINE_TOOL_CANDIDATES {
            if let Some(dir) = self.walk(candidate) {
                let path = dir.join(&file_name);
                if path.is_file() {
                    debug!("Resolved {} to {:?}", tool, path);
                    return Ok(path);
                }
            }
        }
        Err(LocatorError::ToolNotFound(tool))
    }

    /// Resolve a tool that lives at a fixed location under the SDK root
    fn find_fixed_tool(
        &self,
        dir: &str,
        tool: &'static str,
    ) -> Result<PathBuf, LocatorError> {
        let path = self.sdk_root.join(dir).join(exe_name(tool));
        if path.is_file() {
            debug!("Resolved {} to {:?}", tool, path);
            Ok(path)
        } else {
            Err(LocatorError::ToolNotFound(tool))
        }
    }

    pub fn sdkmanager(&self) -> Result<PathBuf, LocatorError> {
        self.find_script_tool("sdkmanager")
    }

    pub fn avdmanager(&self) -> Result<PathBuf, LocatorError> {
        self.find_script_tool("avdmanager")
    }

    pub fn emulator(&self) -> Result<PathBuf, LocatorError> {
        self.find_fixed_tool("emulator", "emulator")
    }

    pub fn adb(&self) -> Result<PathBuf, LocatorError> {
        self.find_fixed_tool("platform-tools", "adb")
    }
}

/// Highest-versioned immediate child directory, skipping files and
/// unreadable entries. Ties keep the first entry encountered.
fn highest_versioned_child(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut best: Option<(String, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        match best {
            Some((ref best_name, _))
                if version::compare(&name, best_name) != Ordering::Greater => {}
            _ => best = Some((name, path)),
        }
    }
    best.map(|(_, path)| path)
}

/// Ensure the file at `path` carries the executable bit, promoting it when
/// the current user may. SDK binaries routinely arrive without it in
/// container and CI images.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<(), LocatorError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    if perms.mode() & 0o111 != 0 {
        return Ok(());
    }
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
        .map_err(|_| LocatorError::NotExecutable(path.to_path_buf()))
}

#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> Result<(), LocatorError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_candidate_priority_order() {
        let root = TempDir::new().unwrap();
        let sdk = root.path();
        touch(&sdk.join("cmdline-tools/tools/bin/sdkmanager"));
        touch(&sdk.join("cmdline-tools/latest/bin/sdkmanager"));
        touch(&sdk.join("cmdline-tools/8.0/bin/sdkmanager"));
        touch(&sdk.join("tools/bin/sdkmanager"));

        let layout = SdkLayout::new(sdk).unwrap();
        assert_eq!(
            layout.sdkmanager().unwrap(),
            sdk.join("cmdline-tools/tools/bin/sdkmanager")
        );

        fs::remove_dir_all(sdk.join("cmdline-tools/tools")).unwrap();
        assert_eq!(
            layout.sdkmanager().unwrap(),
            sdk.join("cmdline-tools/latest/bin/sdkmanager")
        );

        fs::remove_dir_all(sdk.join("cmdline-tools/latest")).unwrap();
        assert_eq!(
            layout.sdkmanager().unwrap(),
            sdk.join("cmdline-tools/8.0/bin/sdkmanager")
        );

        fs::remove_dir_all(sdk.join("cmdline-tools")).unwrap();
        assert_eq!(layout.sdkmanager().unwrap(), sdk.join("tools/bin/sdkmanager"));

        fs::remove_dir_all(sdk.join("tools")).unwrap();
        let err = layout.sdkmanager().unwrap_err();
        assert!(err.to_string().contains("sdkmanager"));
    }

    #[test]
    fn test_wildcard_picks_highest_version() {
        let root = TempDir::new().unwrap();
        let sdk = root.path();
        for version in ["1", "2.1", "3", "10.0.1"] {
            touch(&sdk.join("cmdline-tools").join(version).join("bin/avdmanager"));
        }

        let layout = SdkLayout::new(sdk).unwrap();
        assert_eq!(
            layout.avdmanager().unwrap(),
            sdk.join("cmdline-tools/10.0.1/bin/avdmanager")
        );

        for (removed, next) in [("10.0.1", "3"), ("3", "2.1"), ("2.1", "1")] {
            fs::remove_dir_all(sdk.join("cmdline-tools").join(removed)).unwrap();
            assert_eq!(
                layout.avdmanager().unwrap(),
                sdk.join("cmdline-tools").join(next).join("bin/avdmanager")
            );
        }

        fs::remove_dir_all(sdk.join("cmdline-tools/1")).unwrap();
        assert!(matches!(
            layout.avdmanager(),
            Err(LocatorError::ToolNotFound("avdmanager"))
        ));
    }

    #[test]
    fn test_wildcard_ignores_plain_files() {
        let root = TempDir::new().unwrap();
        let sdk = root.path();
        touch(&sdk.join("cmdline-tools/2.0/bin/sdkmanager"));
        // A stray file with a larger version-looking name must not win.
        touch(&sdk.join("cmdline-tools/99.0"));

        let layout = SdkLayout::new(sdk).unwrap();
        assert_eq!(
            layout.sdkmanager().unwrap(),
            sdk.join("cmdline-tools/2.0/bin/sdkmanager")
        );
    }

    #[test]
    fn test_fixed_tools() {
        let root = TempDir::new().unwrap();
        let sdk = root.path();
        touch(&sdk.join("emulator/emulator"));
        touch(&sdk.join("platform-tools/adb"));

        let layout = SdkLayout::new(sdk).unwrap();
        assert!(layout.emulator().is_ok());
        assert!(layout.adb().is_ok());

        fs::remove_file(sdk.join("platform-tools/adb")).unwrap();
        assert!(matches!(
            layout.adb(),
            Err(LocatorError::ToolNotFound("adb"))
        ));
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            SdkLayout::new("/nonexistent/sdk/root"),
            Err(LocatorError::MissingRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_promotes_bit() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let tool = root.path().join("sdkmanager");
        fs::write(&tool, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();

        ensure_executable(&tool).unwrap();
        let mode = fs::metadata(&tool).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);

        // Already executable is a no-op.
        ensure_executable(&tool).unwrap();
    }
}
