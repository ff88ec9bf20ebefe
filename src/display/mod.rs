//! Presentation of speed updates
//!
//! The monitor loop publishes into a watch channel and never waits on us.
//! The render task picks up the newest value, so a slow renderer only skips
//! intermediate updates.

pub mod console;
pub mod notification;

use anyhow::Result;
use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::structs::RendererKind;
use crate::display::console::ConsoleRenderer;
use crate::display::notification::NotificationRenderer;
use crate::service::monitor::SpeedUpdate;

pub enum Renderer {
    Console(ConsoleRenderer),
    Notification(NotificationRenderer),
}

impl Renderer {
    /// Build the configured renderer, falling back to the console
    pub async fn from_kind(kind: RendererKind) -> Self {
        match kind {
            RendererKind::Console => Self::Console(ConsoleRenderer::new()),
            RendererKind::Notification => match NotificationRenderer::new().await {
                Ok(r) => Self::Notification(r),
                Err(e) => {
                    warn!("{:#}, falling back to console output", e);
                    Self::Console(ConsoleRenderer::new())
                }
            },
        }
    }

    pub async fn present(&mut self, update: &SpeedUpdate) -> Result<()> {
        match self {
            Self::Console(r) => r.present(update),
            Self::Notification(r) => r.present(update).await,
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        match self {
            Self::Console(_) => Ok(()),
            Self::Notification(r) => r.close().await,
        }
    }
}

/// Render every new update until the sending side (the monitor loop) goes away
pub fn spawn_renderer(
    mut renderer: Renderer,
    mut updates: watch::Receiver<Option<SpeedUpdate>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            let Some(update) = update else {
                continue;
            };
            if let Err(e) = renderer.present(&update).await {
                warn!("Failed to present speed update: {:#}", e);
            }
        }

        if let Err(e) = renderer.close().await {
            warn!("Failed to release display surface: {:#}", e);
        }
        debug!("Renderer stopped");
    })
}
