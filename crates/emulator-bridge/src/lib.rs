//! Emulator Bridge
//!
//! Drives a single emulator instance through its lifecycle: negotiate a
//! free console port, launch the process, poll for boot completion, and
//! tear everything down again.

pub mod adb;
pub mod avd;
pub mod boot;
pub mod handle;
pub mod launcher;
pub mod port;
pub mod terminate;

pub use adb::{AdbError, AdbProxy};
pub use avd::{AvdCreator, AvdError};
pub use boot::{BootError, BootWaiter};
pub use handle::LaunchHandle;
pub use launcher::{EmulatorLauncher, LaunchError};
pub use port::{negotiate, select_port, InstanceId, PortError, PORT_MAX, PORT_MIN};
pub use terminate::terminate;
