//! Cumulative byte counters
//!
//! Reads /proc/net/dev for the host-wide received/transmitted byte totals.

use anyhow::{Context, Result};
use log::debug;
use std::time::Instant;

/// One reading of the cumulative byte counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub timestamp: Instant,
}

/// Anything that can produce a fresh counter sample
pub trait CounterSource {
    fn read(&mut self) -> Result<Sample>;
}

/// Counter source backed by /proc/net/dev
#[derive(Debug, Clone, Default)]
pub struct ProcCounters {
    include_virtual: bool,
}

impl ProcCounters {
    pub fn new(include_virtual: bool) -> Self {
        Self { include_virtual }
    }
}

impl CounterSource for ProcCounters {
    fn read(&mut self) -> Result<Sample> {
        let devices = procfs::net::dev_status().context("Failed to read /proc/net/dev")?;
        let timestamp = Instant::now();

        let (rx_bytes, tx_bytes) = sum_counters(
            devices
                .iter()
                .map(|(name, dev)| (name.as_str(), dev.recv_bytes, dev.sent_bytes)),
            self.include_virtual,
        );

        debug!("Counters: rx={} tx={} ({} interfaces)", rx_bytes, tx_bytes, devices.len());
        Ok(Sample {
            rx_bytes,
            tx_bytes,
            timestamp,
        })
    }
}

/// Sum (name, rx, tx) triples, skipping loopback and virtual interfaces unless asked
pub fn sum_counters<'a>(
    devices: impl IntoIterator<Item = (&'a str, u64, u64)>,
    include_virtual: bool,
) -> (u64, u64) {
    devices
        .into_iter()
        .filter(|(name, _, _)| include_virtual || !is_virtual_interface(name))
        .fold((0u64, 0u64), |(rx, tx), (_, dev_rx, dev_tx)| {
            (rx.saturating_add(dev_rx), tx.saturating_add(dev_tx))
        })
}

/// Loopback, bridges, tunnels and container links double-count physical traffic
pub fn is_virtual_interface(name: &str) -> bool {
    name == "lo"
        || name.starts_with("docker")
        || name.starts_with("veth")
        || name.starts_with("virbr")
        || name.starts_with("tun")
        || name.starts_with("tap")
        || name.starts_with("br-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_interfaces_excluded() {
        let devices = [
            ("lo", 1_000_000, 1_000_000),
            ("wlan0", 300, 30),
            ("eth0", 200, 20),
            ("docker0", 50, 5),
            ("veth12ab", 50, 5),
            ("br-3f2a", 50, 5),
            ("tun0", 7, 7),
        ];

        assert_eq!(sum_counters(devices, false), (500, 50));
        assert_eq!(sum_counters(devices, true), (1_000_657, 1_000_072));
    }

    #[test]
    fn test_sum_saturates() {
        let devices = [("eth0", u64::MAX, 1), ("eth1", 10, 1)];
        assert_eq!(sum_counters(devices, false), (u64::MAX, 2));
    }

    #[test]
    fn test_virtual_detection() {
        assert!(is_virtual_interface("lo"));
        assert!(is_virtual_interface("virbr0"));
        assert!(!is_virtual_interface("wlp2s0"));
        assert!(!is_virtual_interface("enp3s0"));
    }
}
