//! Persistent desktop notification
//!
//! Talks to org.freedesktop.Notifications on the session bus. One
//! notification is created and then replaced in place on every update.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use zbus::zvariant::Value;
use zbus::{proxy, Connection};

use crate::service::monitor::SpeedUpdate;

const APP_NAME: &str = "speedmeter";
const SUMMARY: &str = "Network Speed Monitor";
const ICON: &str = "network-transmit-receive";

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

pub struct NotificationRenderer {
    proxy: NotificationsProxy<'static>,
    id: u32,
}

impl NotificationRenderer {
    pub async fn new() -> Result<Self> {
        let connection = Connection::session()
            .await
            .context("Failed to connect to session D-Bus")?;
        let proxy = NotificationsProxy::new(&connection)
            .await
            .context("Notification service unavailable")?;

        info!("Showing speed in a desktop notification");
        Ok(Self { proxy, id: 0 })
    }

    pub async fn present(&mut self, update: &SpeedUpdate) -> Result<()> {
        let body = notification_body(update);

        let mut hints = HashMap::new();
        hints.insert("urgency", Value::U8(0));
        hints.insert("transient", Value::Bool(false));
        hints.insert("suppress-sound", Value::Bool(true));

        self.id = self
            .proxy
            .notify(APP_NAME, self.id, ICON, SUMMARY, &body, &[], hints, 0)
            .await
            .context("Failed to update notification")?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.id != 0 {
            self.proxy.close_notification(self.id).await?;
            debug!("Closed notification {}", self.id);
            self.id = 0;
        }
        Ok(())
    }
}

/// "down / up", plus the signal line while on Wi-Fi
pub fn notification_body(update: &SpeedUpdate) -> String {
    let speed = format!(
        "{} / {}",
        update.rates.download_label, update.rates.upload_label
    );
    match update.signal_percent {
        Some(pct) => format!("{}\nSignal: {}%", speed, pct),
        None => speed,
    }
}
