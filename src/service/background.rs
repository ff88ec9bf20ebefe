//! Periodic one-shot speed check
//!
//! Runs outside the monitor loop on a long interval and only under the
//! configured constraints (connected, charging, on Wi-Fi). Each check builds
//! its own estimator: baseline sample, short wait, second sample.

use anyhow::Result;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::config::structs::BackgroundConfig;
use crate::network::connectivity::ConnectivityProbe;
use crate::network::counters::CounterSource;
use crate::network::estimator::RateEstimator;
use crate::system::power::ChargeState;

/// Default wait between the baseline and the measured sample
pub const WARMUP: Duration = Duration::from_secs(1);

/// Completion result of one check
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub download_rate: u64,
    pub upload_rate: u64,
    pub download_label: String,
    pub upload_label: String,
    pub checked_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Completed(CheckReport),
    Deferred(&'static str),
}

/// Take a baseline, wait, sample again with a fresh estimator
pub async fn sample_once<C: CounterSource>(
    counters: &mut C,
    warmup: Duration,
) -> Result<CheckReport> {
    let mut estimator = RateEstimator::new();
    estimator.sample(counters.read()?);
    time::sleep(warmup).await;
    let rates = estimator.sample(counters.read()?);

    Ok(CheckReport {
        download_rate: rates.download_rate,
        upload_rate: rates.upload_rate,
        download_label: rates.download_label,
        upload_label: rates.upload_label,
        checked_at: Local::now(),
    })
}

pub struct BackgroundCheck<C, P, S> {
    config: BackgroundConfig,
    counters: C,
    probe: P,
    power: S,
    warmup: Duration,
}

impl<C: CounterSource, P: ConnectivityProbe, S: ChargeState> BackgroundCheck<C, P, S> {
    pub fn new(config: BackgroundConfig, counters: C, probe: P, power: S) -> Self {
        Self {
            config,
            counters,
            probe,
            power,
            warmup: WARMUP,
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Why the check cannot run right now, if anything
    fn unmet_constraint(&self) -> Result<Option<&'static str>> {
        if !self.probe.has_internet()? {
            return Ok(Some("not connected"));
        }
        if self.config.require_charging && !self.power.is_charging() {
            return Ok(Some("not charging"));
        }
        if self.config.wifi_only && !self.probe.is_on_wifi()? {
            return Ok(Some("not on Wi-Fi"));
        }
        Ok(None)
    }

    pub async fn check(&mut self) -> Result<CheckOutcome> {
        if let Some(reason) = self.unmet_constraint()? {
            return Ok(CheckOutcome::Deferred(reason));
        }
        let report = sample_once(&mut self.counters, self.warmup).await?;
        Ok(CheckOutcome::Completed(report))
    }

    /// Check every `interval_secs` until shutdown
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        info!("Background check every {}s", period.as_secs());

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            match self.check().await {
                Ok(CheckOutcome::Completed(report)) => info!(
                    "Background check: down {} up {}",
                    report.download_label, report.upload_label
                ),
                Ok(CheckOutcome::Deferred(reason)) => {
                    debug!("Background check deferred: {}", reason)
                }
                Err(e) => warn!("Background check failed: {:#}", e),
            }
        }

        debug!("Background check stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::counters::Sample;
    use std::time::Instant;

    struct Counters {
        base: Instant,
        reads: u64,
    }

    impl CounterSource for Counters {
        fn read(&mut self) -> Result<Sample> {
            let n = self.reads;
            self.reads += 1;
            Ok(Sample {
                rx_bytes: 1_000_000 + n * 3 * 1024 * 1024,
                tx_bytes: 1_000_000 + n * 4096,
                timestamp: self.base + Duration::from_secs(n),
            })
        }
    }

    struct Probe {
        online: bool,
        wifi: bool,
    }

    impl ConnectivityProbe for Probe {
        fn has_internet(&self) -> Result<bool> {
            Ok(self.online)
        }
        fn is_on_wifi(&self) -> Result<bool> {
            Ok(self.wifi)
        }
        fn wifi_signal_percent(&self) -> Result<Option<u8>> {
            Ok(None)
        }
    }

    struct Power(bool);

    impl ChargeState for Power {
        fn is_charging(&self) -> bool {
            self.0
        }
    }

    fn check(online: bool, wifi: bool, charging: bool) -> BackgroundCheck<Counters, Probe, Power> {
        BackgroundCheck::new(
            BackgroundConfig::default(),
            Counters {
                base: Instant::now(),
                reads: 0,
            },
            Probe { online, wifi },
            Power(charging),
        )
        .with_warmup(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_completes_when_constraints_hold() {
        let CheckOutcome::Completed(report) = check(true, true, true).check().await.unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.download_label, "3 MB/s");
        assert_eq!(report.upload_label, "4 KB/s");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["download_rate"], 3 * 1024 * 1024);
        assert_eq!(json["upload_label"], "4 KB/s");
    }

    #[tokio::test]
    async fn test_each_check_starts_fresh() {
        let mut bg = check(true, true, true);
        for _ in 0..3 {
            let CheckOutcome::Completed(report) = bg.check().await.unwrap() else {
                panic!("expected a report");
            };
            assert_eq!(report.download_rate, 3 * 1024 * 1024);
        }
    }

    #[tokio::test]
    async fn test_deferred_reasons() {
        assert!(matches!(
            check(false, true, true).check().await.unwrap(),
            CheckOutcome::Deferred("not connected")
        ));
        assert!(matches!(
            check(true, true, false).check().await.unwrap(),
            CheckOutcome::Deferred("not charging")
        ));
        assert!(matches!(
            check(true, false, true).check().await.unwrap(),
            CheckOutcome::Deferred("not on Wi-Fi")
        ));
    }

    #[tokio::test]
    async fn test_relaxed_constraints() {
        let mut bg = check(true, false, false);
        bg.config.require_charging = false;
        bg.config.wifi_only = false;
        assert!(matches!(bg.check().await.unwrap(), CheckOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let bg = check(true, true, true);
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(bg.run(rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("background check did not stop")
            .unwrap();
    }
}
