//! The monitor loop
//!
//! Once per tick: pause gate, connectivity gate, sample counters, estimate
//! rates, read Wi-Fi signal, publish. Transient read failures skip the tick;
//! only cancellation ends the loop.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::network::connectivity::ConnectivityProbe;
use crate::network::counters::CounterSource;
use crate::network::estimator::{RateEstimator, RateResult};
use crate::service::activity::{ActivitySource, ActivitySubscription};
use crate::service::pause::PauseController;

/// What the presentation layer receives each active tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedUpdate {
    pub rates: RateResult,
    pub signal_percent: Option<u8>,
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    Offline,
    Skipped,
    Delivered(SpeedUpdate),
}

pub struct MonitorLoop<C, P> {
    counters: C,
    probe: P,
    estimator: RateEstimator,
    pause: PauseController,
    sources: Vec<ActivitySource>,
    updates: watch::Sender<Option<SpeedUpdate>>,
    period: Duration,
}

impl<C: CounterSource, P: ConnectivityProbe> MonitorLoop<C, P> {
    pub fn new(
        counters: C,
        probe: P,
        pause: PauseController,
        updates: watch::Sender<Option<SpeedUpdate>>,
        period: Duration,
    ) -> Self {
        Self {
            counters,
            probe,
            estimator: RateEstimator::new(),
            pause,
            sources: Vec::new(),
            updates,
            period,
        }
    }

    /// Activity sources registered for the duration of `run`
    pub fn with_sources(mut self, sources: Vec<ActivitySource>) -> Self {
        self.sources = sources;
        self
    }

    /// Run until `shutdown` flips to true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Monitor starting (tick: {}ms)", self.period.as_millis());

        self.pause.reset();
        let _subscription =
            ActivitySubscription::start(std::mem::take(&mut self.sources), self.pause.clone());

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

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

            self.tick();
        }

        info!("Monitor stopped");
    }

    /// Single tick of the monitor loop
    pub fn tick(&mut self) -> TickOutcome {
        if self.pause.is_paused() {
            debug!("Tick: paused");
            return TickOutcome::Paused;
        }

        match self.probe.has_internet() {
            Ok(true) => {}
            Ok(false) => {
                debug!("Tick: no internet");
                return TickOutcome::Offline;
            }
            Err(e) => {
                warn!("Connectivity check failed: {:#}", e);
                return TickOutcome::Skipped;
            }
        }

        let sample = match self.counters.read() {
            Ok(s) => s,
            Err(e) => {
                warn!("Counter read failed: {:#}", e);
                return TickOutcome::Skipped;
            }
        };
        let rates = self.estimator.sample(sample);

        let signal_percent = match self.probe.is_on_wifi() {
            Ok(true) => match self.probe.wifi_signal_percent() {
                Ok(pct) => pct,
                Err(e) => {
                    warn!("Wi-Fi signal read failed: {:#}", e);
                    return TickOutcome::Skipped;
                }
            },
            Ok(false) => None,
            Err(e) => {
                warn!("Wi-Fi check failed: {:#}", e);
                return TickOutcome::Skipped;
            }
        };

        let update = SpeedUpdate {
            rates,
            signal_percent,
        };
        debug!(
            "Tick: down {} up {} signal {:?}",
            update.rates.download_label, update.rates.upload_label, update.signal_percent
        );

        // Never blocks; the renderer sees only the newest value
        self.updates.send_replace(Some(update.clone()));
        TickOutcome::Delivered(update)
    }
}
