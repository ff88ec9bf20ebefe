//! External activity signals (display/screen saver, sleep, Unix signals)
//!
//! Each source forwards `ActivityEvent`s into one channel. A pump task tracks
//! which sources currently report inactive and pauses while any of them does.
//! The whole set lives inside an `ActivitySubscription` guard: dropping it
//! aborts every task it spawned.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zbus::{proxy, Connection};

use crate::config::structs::PauseConfig;
use crate::service::pause::PauseController;

/// External context became inactive (display off) or active again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Inactive,
    Active,
}

// Screen saver on the session bus: Active == display blanked
#[proxy(
    interface = "org.freedesktop.ScreenSaver",
    default_service = "org.freedesktop.ScreenSaver",
    default_path = "/org/freedesktop/ScreenSaver"
)]
trait ScreenSaver {
    #[zbus(signal)]
    fn active_changed(&self, active: bool) -> zbus::Result<()>;
}

// logind on the system bus
#[proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait Login1Manager {
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// Where pause/resume events come from
#[derive(Debug)]
pub enum ActivitySource {
    ScreenSaver,
    Sleep,
    UnixSignals,
    Channel(mpsc::Receiver<ActivityEvent>),
}

impl ActivitySource {
    /// Sources enabled in the config
    pub fn from_config(config: &PauseConfig) -> Vec<Self> {
        let mut sources = Vec::new();
        if config.screensaver {
            sources.push(Self::ScreenSaver);
        }
        if config.sleep {
            sources.push(Self::Sleep);
        }
        if config.signals {
            sources.push(Self::UnixSignals);
        }
        sources
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ScreenSaver => "screensaver",
            Self::Sleep => "sleep",
            Self::UnixSignals => "signals",
            Self::Channel(_) => "channel",
        }
    }

    /// Forward events until the source ends or the receiver goes away
    async fn forward(self, id: usize, tx: mpsc::Sender<(usize, ActivityEvent)>) -> Result<()> {
        match self {
            Self::ScreenSaver => {
                let connection = Connection::session()
                    .await
                    .context("Failed to connect to session D-Bus")?;
                let proxy = ScreenSaverProxy::new(&connection).await?;
                let mut stream = proxy.receive_active_changed().await?;

                while let Some(signal) = stream.next().await {
                    let event = if *signal.args()?.active() {
                        ActivityEvent::Inactive
                    } else {
                        ActivityEvent::Active
                    };
                    if tx.send((id, event)).await.is_err() {
                        break;
                    }
                }
            }
            Self::Sleep => {
                let connection = Connection::system()
                    .await
                    .context("Failed to connect to system D-Bus")?;
                let proxy = Login1ManagerProxy::new(&connection).await?;
                let mut stream = proxy.receive_prepare_for_sleep().await?;

                while let Some(signal) = stream.next().await {
                    let event = if *signal.args()?.start() {
                        ActivityEvent::Inactive
                    } else {
                        ActivityEvent::Active
                    };
                    if tx.send((id, event)).await.is_err() {
                        break;
                    }
                }
            }
            Self::UnixSignals => {
                let mut pause = signal(SignalKind::user_defined1())
                    .context("Failed to register SIGUSR1 handler")?;
                let mut resume = signal(SignalKind::user_defined2())
                    .context("Failed to register SIGUSR2 handler")?;

                loop {
                    let event = tokio::select! {
                        Some(()) = pause.recv() => ActivityEvent::Inactive,
                        Some(()) = resume.recv() => ActivityEvent::Active,
                        else => break,
                    };
                    if tx.send((id, event)).await.is_err() {
                        break;
                    }
                }
            }
            Self::Channel(mut rx) => {
                while let Some(event) = rx.recv().await {
                    if tx.send((id, event)).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Registration of all activity sources for the lifetime of a monitor run
pub struct ActivitySubscription {
    tasks: Vec<JoinHandle<()>>,
}

impl ActivitySubscription {
    pub fn start(sources: Vec<ActivitySource>, pause: PauseController) -> Self {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tasks = Vec::with_capacity(sources.len() + 1);

        for (id, source) in sources.into_iter().enumerate() {
            let name = source.name();
            let tx = tx.clone();
            info!("Subscribing to {} activity events", name);
            tasks.push(tokio::spawn(async move {
                match source.forward(id, tx).await {
                    Ok(()) => debug!("Activity source {} ended", name),
                    Err(e) => warn!("Activity source {} unavailable: {:#}", name, e),
                }
            }));
        }

        // Resume only once every source that went inactive is active again
        tasks.push(tokio::spawn(async move {
            let mut inactive = BTreeSet::new();
            while let Some((id, event)) = rx.recv().await {
                debug!("Activity event from source {}: {:?}", id, event);
                match event {
                    ActivityEvent::Inactive => inactive.insert(id),
                    ActivityEvent::Active => inactive.remove(&id),
                };
                pause.apply(if inactive.is_empty() {
                    ActivityEvent::Active
                } else {
                    ActivityEvent::Inactive
                });
            }
        }));

        Self { tasks }
    }
}

impl Drop for ActivitySubscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!("Activity subscription released");
    }
}
