//! Power supply state
//!
//! Decides whether the host counts as "charging" for the background check.

use log::debug;
use std::fs;
use std::path::PathBuf;

/// Power source state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerSource {
    AC,
    Battery,
    Unknown,
}

/// Anything that can tell whether the host is on external power
pub trait ChargeState {
    fn is_charging(&self) -> bool;
}

/// Reads /sys/class/power_supply
pub struct PowerManager {
    root: PathBuf,
}

impl PowerManager {
    pub fn new() -> Self {
        Self::with_root("/sys/class/power_supply")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Collect every supply first, then decide (AC wins over any battery)
    pub fn power_source(&self) -> PowerSource {
        let mut ac_online = false;
        let mut battery_discharging = false;
        let mut battery_found = false;

        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();

                // Peripheral batteries (mice, keyboards, pens)
                if name.contains("hid") || name.contains("mouse") ||
                   name.contains("keyboard") || name.contains("wacom") {
                    continue;
                }

                if name.starts_with("AC") || name.starts_with("ADP") || name.contains("ACAD") {
                    if let Ok(status) = fs::read_to_string(entry.path().join("online")) {
                        if status.trim() == "1" {
                            ac_online = true;
                        }
                    }
                }

                if name.starts_with("BAT") || name == "battery" {
                    battery_found = true;
                    if let Ok(status) = fs::read_to_string(entry.path().join("status")) {
                        match status.trim() {
                            "Charging" | "Full" | "Not charging" => ac_online = true,
                            "Discharging" => battery_discharging = true,
                            _ => {}
                        }
                    }
                }
            }
        }

        let source = if ac_online {
            PowerSource::AC
        } else if battery_found && battery_discharging {
            PowerSource::Battery
        } else if !battery_found {
            // No battery = desktop
            PowerSource::AC
        } else {
            PowerSource::Unknown
        };

        debug!("Power source: {:?}", source);
        source
    }

    /// Battery percentage (if available)
    pub fn battery_percentage(&self) -> Option<u32> {
        let entries = fs::read_dir(&self.root).ok()?;

        entries.flatten().find_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !(name.starts_with("BAT") || name == "battery") {
                return None;
            }
            fs::read_to_string(entry.path().join("capacity"))
                .ok()?
                .trim()
                .parse()
                .ok()
        })
    }
}

impl ChargeState for PowerManager {
    fn is_charging(&self) -> bool {
        self.power_source() == PowerSource::AC
    }
}

impl Default for PowerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn supply(root: &TempDir, name: &str, files: &[(&str, &str)]) {
        let dir = root.path().join(name);
        fs::create_dir(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), format!("{}\n", content)).unwrap();
        }
    }

    #[test]
    fn test_desktop_without_battery_counts_as_charging() {
        let root = TempDir::new().unwrap();
        let power = PowerManager::with_root(root.path());
        assert_eq!(power.power_source(), PowerSource::AC);
        assert!(power.is_charging());
        assert_eq!(power.battery_percentage(), None);
    }

    #[test]
    fn test_discharging_laptop() {
        let root = TempDir::new().unwrap();
        supply(&root, "BAT0", &[("status", "Discharging"), ("capacity", "42")]);
        supply(&root, "AC", &[("online", "0")]);
        let power = PowerManager::with_root(root.path());

        assert_eq!(power.power_source(), PowerSource::Battery);
        assert!(!power.is_charging());
        assert_eq!(power.battery_percentage(), Some(42));
    }

    #[test]
    fn test_charging_battery() {
        let root = TempDir::new().unwrap();
        supply(&root, "BAT1", &[("status", "Charging")]);
        assert!(PowerManager::with_root(root.path()).is_charging());
    }

    #[test]
    fn test_peripheral_battery_ignored() {
        let root = TempDir::new().unwrap();
        supply(&root, "hidpp_battery_0", &[("status", "Discharging")]);
        supply(&root, "ADP1", &[("online", "1")]);
        assert!(PowerManager::with_root(root.path()).is_charging());
    }
}
