//! Port and Serial Negotiation
//!
//! Picks a console port for the next launch that does not collide with
//! any emulator instance currently visible to adb.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::adb::{AdbError, AdbProxy};

/// Bottom of the emulator console port range
pub const PORT_MIN: u16 = 5554;
/// Top of the emulator console port range
pub const PORT_MAX: u16 = 5680;

/// Matches adb `devices` rows for emulator instances in the ready state,
/// e.g. `emulator-5554       device`. The serial format may change in
/// future platform-tools releases and lead to breakages here.
static EMULATOR_DEVICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(emulator-(\d{1,5}))\s+device$").expect("hard-coded pattern"));

/// Negotiation errors
#[derive(Debug, Error)]
pub enum PortError {
    #[error("no free emulator port between {} and {}", PORT_MIN, PORT_MAX)]
    Exhausted,
    #[error(transparent)]
    Adb(#[from] AdbError),
}

/// The identifier binding one launch to the instance adb sees.
///
/// Chosen once per launch and immutable from then on; the launcher passes
/// the port on the command line and the boot waiter targets the derived
/// serial, so both always agree on which instance they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceId {
    port: u16,
}

impl InstanceId {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serial adb uses to address this instance
    pub fn serial(&self) -> String {
        format!("emulator-{}", self.port)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emulator-{}", self.port)
    }
}

/// Console ports reserved by attached, ready emulator instances
fn reserved_ports(device_lines: &[String]) -> HashSet<u16> {
    device_lines
        .iter()
        .filter_map(|line| EMULATOR_DEVICE_LINE.captures(line))
        .filter_map(|caps| caps[2].parse().ok())
        .collect()
}

/// Pick the first free even port, scanning from the top of the range down.
/// Starting high reduces the chance of colliding with another instance
/// that is starting up concurrently in the same range.
pub fn select_port(device_lines: &[String]) -> Result<InstanceId, PortError> {
    let reserved = reserved_ports(device_lines);

    let mut port = PORT_MAX;
    while port >= PORT_MIN {
        if !reserved.contains(&port) {
            debug!("Selected emulator port {}", port);
            return Ok(InstanceId::new(port));
        }
        port -= 2;
    }

    Err(PortError::Exhausted)
}

/// Query adb for attached instances and negotiate a free identifier
pub async fn negotiate(adb: &AdbProxy) -> Result<InstanceId, PortError> {
    let lines = adb.devices().await?;
    select_port(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(rows: &[&str]) -> Vec<String> {
        rows.iter().map(|row| row.to_string()).collect()
    }

    #[test]
    fn test_reserved_parsing_skips_unrelated_rows() {
        let output = lines(&[
            "List of devices attached",
            "emulator-5554\tdevice",
            "emulator-5556       device",
            "emulator-5558       offline",
            "192.168.1.2:42839   device",
            "",
        ]);
        let reserved = reserved_ports(&output);
        assert_eq!(reserved, HashSet::from([5554, 5556]));
    }

    #[test]
    fn test_select_scans_from_the_top() {
        let output = lines(&["emulator-5554\tdevice", "emulator-5556\tdevice"]);
        let id = select_port(&output).unwrap();
        assert_eq!(id.port(), PORT_MAX);
    }

    #[test]
    fn test_select_skips_reserved_top_ports() {
        let output = lines(&[
            "emulator-5680\tdevice",
            "emulator-5678\tdevice",
        ]);
        let id = select_port(&output).unwrap();
        assert_eq!(id.port(), 5676);
    }

    #[test]
    fn test_exhausted_range() {
        let rows: Vec<String> = (PORT_MIN..=PORT_MAX)
            .step_by(2)
            .map(|port| format!("emulator-{}\tdevice", port))
            .collect();
        assert!(matches!(select_port(&rows), Err(PortError::Exhausted)));
    }

    #[test]
    fn test_serial_derivation() {
        let id = InstanceId::new(5584);
        assert_eq!(id.serial(), "emulator-5584");
        assert_eq!(id.to_string(), "emulator-5584");
    }
}
