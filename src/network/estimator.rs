//! Throughput estimator
//!
//! Turns consecutive cumulative byte counter samples into per-second rates:
//! (Current - Last) / whole seconds elapsed.

use log::debug;

use crate::network::counters::Sample;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Download/upload rates in bytes per second, with display labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateResult {
    pub download_rate: u64,
    pub upload_rate: u64,
    pub download_label: String,
    pub upload_label: String,
}

impl RateResult {
    pub fn new(download_rate: u64, upload_rate: u64) -> Self {
        Self {
            download_rate,
            upload_rate,
            download_label: format_rate(download_rate),
            upload_label: format_rate(upload_rate),
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }
}

impl Default for RateResult {
    fn default() -> Self {
        Self::zero()
    }
}

/// Format a byte rate as "N B/s", "N KB/s" or "N MB/s" (truncated, never rounded)
pub fn format_rate(bytes_per_sec: u64) -> String {
    if bytes_per_sec < KIB {
        format!("{} B/s", bytes_per_sec)
    } else if bytes_per_sec < MIB {
        format!("{} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{} MB/s", bytes_per_sec / MIB)
    }
}

/// Rate estimator holding the previous sample
///
/// The first sample only establishes a baseline and reports zero rates.
/// A window shorter than one whole second (or a clock that went backward)
/// reuses the last result and keeps the baseline.
#[derive(Debug, Default)]
pub struct RateEstimator {
    previous: Option<Sample>,
    last_result: RateResult,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, current: Sample) -> RateResult {
        let previous = match self.previous {
            Some(prev) => prev,
            None => {
                debug!("Warm-up sample: rx={} tx={}", current.rx_bytes, current.tx_bytes);
                self.previous = Some(current);
                self.last_result = RateResult::zero();
                return self.last_result.clone();
            }
        };

        let elapsed_secs = current
            .timestamp
            .checked_duration_since(previous.timestamp)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if elapsed_secs == 0 {
            debug!("Sample window under one second, reusing previous result");
            return self.last_result.clone();
        }

        // Counter regressions (interface restart, wrap) clamp to zero
        let download = current.rx_bytes.saturating_sub(previous.rx_bytes) / elapsed_secs;
        let upload = current.tx_bytes.saturating_sub(previous.tx_bytes) / elapsed_secs;

        self.previous = Some(current);
        self.last_result = RateResult::new(download, upload);

        debug!(
            "Rates over {}s: down {} up {}",
            elapsed_secs, self.last_result.download_label, self.last_result.upload_label
        );
        self.last_result.clone()
    }

    #[cfg(test)]
    pub fn previous(&self) -> Option<Sample> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn at(base: Instant, ms: u64, rx: u64, tx: u64) -> Sample {
        Sample {
            rx_bytes: rx,
            tx_bytes: tx,
            timestamp: base + Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_format_boundaries() {
        assert_eq!(format_rate(0), "0 B/s");
        assert_eq!(format_rate(1023), "1023 B/s");
        assert_eq!(format_rate(1024), "1 KB/s");
        assert_eq!(format_rate(1535), "1 KB/s");
        assert_eq!(format_rate(1_048_575), "1023 KB/s");
        assert_eq!(format_rate(1_048_576), "1 MB/s");
        assert_eq!(format_rate(5 * 1_048_576 - 1), "4 MB/s");
    }

    #[test]
    fn test_first_sample_is_warm_up() {
        let base = Instant::now();
        let mut est = RateEstimator::new();

        let result = est.sample(at(base, 0, 10_000_000, 5_000_000));
        assert_eq!(result, RateResult::zero());
        assert_eq!(result.download_label, "0 B/s");
        assert_eq!(est.previous().map(|s| s.rx_bytes), Some(10_000_000));
    }

    #[test]
    fn test_download_2048_over_one_second() {
        let base = Instant::now();
        let mut est = RateEstimator::new();

        est.sample(at(base, 0, 0, 0));
        let result = est.sample(at(base, 1000, 2048, 0));

        assert_eq!(result.download_rate, 2048);
        assert_eq!(result.download_label, "2 KB/s");
        assert_eq!(result.upload_rate, 0);
    }

    #[test]
    fn test_sub_second_window_keeps_state() {
        let base = Instant::now();
        let mut est = RateEstimator::new();

        est.sample(at(base, 0, 0, 0));
        let first = est.sample(at(base, 1000, 4096, 1024));
        assert_eq!(first.download_rate, 4096);

        // 999ms later: no whole second elapsed
        let second = est.sample(at(base, 1999, 999_999, 999_999));
        assert_eq!(second, first);
        assert_eq!(est.previous().map(|s| s.rx_bytes), Some(4096));
        assert_eq!(est.previous().map(|s| s.timestamp), Some(base + Duration::from_millis(1000)));
    }

    #[test]
    fn test_clock_going_backward_is_ignored() {
        let base = Instant::now() + Duration::from_secs(10);
        let mut est = RateEstimator::new();

        est.sample(at(base, 5000, 100, 100));
        let result = est.sample(at(base, 1000, 10_000, 10_000));
        assert_eq!(result, RateResult::zero());
        assert_eq!(est.previous().map(|s| s.rx_bytes), Some(100));
    }

    #[test]
    fn test_elapsed_is_floored_to_whole_seconds() {
        let base = Instant::now();
        let mut est = RateEstimator::new();

        est.sample(at(base, 0, 0, 0));
        // 2.9s counts as 2s
        let result = est.sample(at(base, 2900, 6000, 3000));
        assert_eq!(result.download_rate, 3000);
        assert_eq!(result.upload_rate, 1500);
    }

    #[test]
    fn test_counter_regression_clamps_to_zero() {
        let base = Instant::now();
        let mut est = RateEstimator::new();

        est.sample(at(base, 0, 50_000, 1_000));
        let result = est.sample(at(base, 1000, 10, 3_048));

        assert_eq!(result.download_rate, 0);
        assert_eq!(result.download_label, "0 B/s");
        assert_eq!(result.upload_rate, 2048);
        // Baseline still advances to the regressed counter
        assert_eq!(est.previous().map(|s| s.rx_bytes), Some(10));
    }

    #[test]
    fn test_increasing_counters_never_negative() {
        let base = Instant::now();
        let mut est = RateEstimator::new();
        let mut rx = 0u64;
        let mut tx = 0u64;

        for i in 0..50u64 {
            rx += (i * 7919) % 100_000;
            tx += (i * 104_729) % 3_000;
            let result = est.sample(at(base, i * 1000 + (i % 3) * 100, rx, tx));
            assert!(result.download_label.ends_with("B/s"));
            assert!(result.download_rate <= rx);
            assert!(result.upload_rate <= tx);
        }
    }
}
