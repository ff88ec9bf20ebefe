//! Connectivity probe
//!
//! Answers three questions about the active network path:
//! is there internet, is it Wi-Fi, and how strong is the signal.
//! The active path is the interface carrying the IPv4 default route.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::PathBuf;

/// RTF_UP from linux/route.h
const RTF_UP: u16 = 0x0001;

/// Signal range mapped onto 0..=100 percent
const MIN_RSSI_DBM: i32 = -100;
const MAX_RSSI_DBM: i32 = -55;
const SIGNAL_LEVELS: i32 = 101;

/// Host connectivity facts at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectivityState {
    pub has_internet: bool,
    pub is_wifi: bool,
    pub signal_percent: Option<u8>,
}

/// Read-only queries against the current network state
pub trait ConnectivityProbe {
    fn has_internet(&self) -> Result<bool>;
    fn is_on_wifi(&self) -> Result<bool>;
    fn wifi_signal_percent(&self) -> Result<Option<u8>>;

    fn snapshot(&self) -> Result<ConnectivityState> {
        Ok(ConnectivityState {
            has_internet: self.has_internet()?,
            is_wifi: self.is_on_wifi()?,
            signal_percent: self.wifi_signal_percent()?,
        })
    }
}

/// Map a signal level in dBm to a percentage
///
/// Linear steps between -100 dBm (0%) and -55 dBm (100%).
pub fn signal_percent(dbm: i32) -> u8 {
    if dbm <= MIN_RSSI_DBM {
        0
    } else if dbm >= MAX_RSSI_DBM {
        (SIGNAL_LEVELS - 1) as u8
    } else {
        ((dbm - MIN_RSSI_DBM) * (SIGNAL_LEVELS - 1) / (MAX_RSSI_DBM - MIN_RSSI_DBM)) as u8
    }
}

/// Probe backed by /proc/net/route, /sys/class/net and /proc/net/wireless
#[derive(Debug, Clone)]
pub struct HostProbe {
    route_table: PathBuf,
    sysfs_net: PathBuf,
    wireless_table: PathBuf,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::with_paths("/proc/net/route", "/sys/class/net", "/proc/net/wireless")
    }
}

impl HostProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(
        route_table: impl Into<PathBuf>,
        sysfs_net: impl Into<PathBuf>,
        wireless_table: impl Into<PathBuf>,
    ) -> Self {
        Self {
            route_table: route_table.into(),
            sysfs_net: sysfs_net.into(),
            wireless_table: wireless_table.into(),
        }
    }

    /// Interface carrying the default route, if any
    pub fn default_interface(&self) -> Result<Option<String>> {
        let table = match fs::read_to_string(&self.route_table) {
            Ok(t) => t,
            // No routing table at all means no network, not a failure
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read {}", self.route_table.display())
                })
            }
        };
        Ok(parse_default_route(&table))
    }

    /// Check if the link is operational (operstate, carrier as fallback)
    fn is_link_up(&self, ifc_name: &str) -> bool {
        let base = self.sysfs_net.join(ifc_name);
        let operstate = fs::read_to_string(base.join("operstate")).unwrap_or_default();

        match operstate.trim() {
            "up" => true,
            // ppp/tun and some drivers never report "up"
            "unknown" => fs::read_to_string(base.join("carrier"))
                .map(|s| s.trim() == "1")
                .unwrap_or(false),
            _ => false,
        }
    }

    fn is_wireless(&self, ifc_name: &str) -> bool {
        let base = self.sysfs_net.join(ifc_name);
        base.join("wireless").exists() || base.join("phy80211").exists()
    }

    fn wifi_interface(&self) -> Result<Option<String>> {
        Ok(self
            .default_interface()?
            .filter(|ifc| self.is_wireless(ifc)))
    }

    fn read_signal_dbm(&self, ifc_name: &str) -> Result<Option<i32>> {
        let table = match fs::read_to_string(&self.wireless_table) {
            Ok(t) => t,
            // Kernels without wireless extensions have no table; signal is unknown
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not present, no signal level", self.wireless_table.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read {}", self.wireless_table.display())
                })
            }
        };
        Ok(parse_wireless_level(&table, ifc_name))
    }
}

impl ConnectivityProbe for HostProbe {
    fn has_internet(&self) -> Result<bool> {
        let Some(ifc) = self.default_interface()? else {
            debug!("No default route");
            return Ok(false);
        };
        let up = self.is_link_up(&ifc);
        debug!("Default route via {} (link up: {})", ifc, up);
        Ok(up)
    }

    fn is_on_wifi(&self) -> Result<bool> {
        Ok(self.wifi_interface()?.is_some())
    }

    fn wifi_signal_percent(&self) -> Result<Option<u8>> {
        let Some(ifc) = self.wifi_interface()? else {
            return Ok(None);
        };
        Ok(self.read_signal_dbm(&ifc)?.map(signal_percent))
    }
}

/// Pick the lowest-metric IPv4 default route from /proc/net/route
fn parse_default_route(table: &str) -> Option<String> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 8 {
                return None;
            }
            let flags = u16::from_str_radix(fields[3], 16).ok()?;
            let metric: u32 = fields[6].parse().ok()?;
            let is_default = fields[1] == "00000000" && fields[7] == "00000000";

            (is_default && flags & RTF_UP != 0).then(|| (metric, fields[0].to_string()))
        })
        .min_by_key(|(metric, _)| *metric)
        .map(|(_, ifc)| ifc)
}

/// Signal level (dBm) for an interface from /proc/net/wireless
///
/// ```text
/// Inter-| sta-|   Quality        |   Discarded packets
///  face | tus | link level noise |  nwid  crypt   frag
/// wlan0: 0000   54.  -56.  -256        0      0      0
/// ```
fn parse_wireless_level(table: &str, ifc_name: &str) -> Option<i32> {
    table.lines().skip(2).find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != ifc_name {
            return None;
        }
        let level: f64 = rest
            .split_whitespace()
            .nth(2)?
            .trim_end_matches('.')
            .parse()
            .ok()?;
        Some(level as i32)
    })
}
