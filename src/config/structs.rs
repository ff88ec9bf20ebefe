use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub counters: CounterConfig,
    #[serde(default)]
    pub pause: PauseConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
}

/// Where speed updates are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Persistent desktop notification (freedesktop Notifications)
    Notification,
    /// One line per update on stdout
    Console,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick period of the monitor loop in milliseconds
    pub tick_ms: u64,
    pub renderer: RendererKind,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            renderer: RendererKind::Notification,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Count loopback, bridge, tunnel and container interfaces as well
    pub include_virtual: bool,
}

/// Which activity sources pause/resume monitoring
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PauseConfig {
    /// org.freedesktop.ScreenSaver ActiveChanged (display off/on)
    pub screensaver: bool,
    /// logind PrepareForSleep
    pub sleep: bool,
    /// SIGUSR1 pauses, SIGUSR2 resumes
    pub signals: bool,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            screensaver: true,
            sleep: true,
            signals: true,
        }
    }
}

/// Periodic one-shot rate check outside the main loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Only run while on external power
    pub require_charging: bool,
    /// Only run while the default route is Wi-Fi
    pub wifi_only: bool,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 15 * 60,
            require_charging: true,
            wifi_only: true,
        }
    }
}
