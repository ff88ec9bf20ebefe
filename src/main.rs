mod config;
mod display;
mod network;
mod service;
mod system;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use crate::config::loader::load_config;
use crate::config::structs::Config;
use crate::display::Renderer;
use crate::network::connectivity::{ConnectivityProbe, HostProbe};
use crate::network::counters::ProcCounters;
use crate::service::activity::ActivitySource;
use crate::service::background::{self, BackgroundCheck};
use crate::service::monitor::MonitorLoop;
use crate::service::pause::PauseController;
use crate::system::power::{ChargeState, PowerManager};

#[derive(Parser)]
#[command(name = "speedmeter")]
#[command(version)]
#[command(about = "Live network speed monitor for Linux desktops", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: /etc/speedmeter/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor continuously and show the current speed (default)
    Monitor,
    /// Measure the current speed once and exit
    Check {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
    /// Show connectivity, power and pause settings
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logger::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Monitor) {
        Commands::Monitor => {
            run_monitor(&config).await?;
        }
        Commands::Check { json } => {
            run_check(&config, json).await?;
        }
        Commands::Status => {
            run_status(&config)?;
        }
    }

    Ok(())
}

/// Run the monitor loop, renderer and background check until Ctrl-C / SIGTERM
async fn run_monitor(config: &Config) -> Result<()> {
    info!("=== speedmeter monitor ===");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (updates_tx, updates_rx) = watch::channel(None);

    let renderer = Renderer::from_kind(config.monitor.renderer).await;
    let render_task = display::spawn_renderer(renderer, updates_rx);

    let monitor = MonitorLoop::new(
        ProcCounters::new(config.counters.include_virtual),
        HostProbe::new(),
        PauseController::new(),
        updates_tx,
        Duration::from_millis(config.monitor.tick_ms.max(1)),
    )
    .with_sources(ActivitySource::from_config(&config.pause));
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx.clone()));

    let background_task = config.background.enabled.then(|| {
        let check = BackgroundCheck::new(
            config.background.clone(),
            ProcCounters::new(config.counters.include_virtual),
            HostProbe::new(),
            PowerManager::new(),
        );
        tokio::spawn(check.run(shutdown_rx.clone()))
    });

    wait_for_shutdown().await?;
    info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);

    if let Err(e) = monitor_task.await {
        error!("Monitor task failed: {}", e);
    }
    if let Some(task) = background_task {
        if let Err(e) = task.await {
            error!("Background check task failed: {}", e);
        }
    }
    // Ends once the monitor dropped its update sender
    if let Err(e) = render_task.await {
        error!("Renderer task failed: {}", e);
    }

    info!("Monitor mode stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

/// One-shot measurement, regardless of background constraints
async fn run_check(config: &Config, json: bool) -> Result<()> {
    let mut counters = ProcCounters::new(config.counters.include_virtual);
    let report = background::sample_once(&mut counters, background::WARMUP).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Download: {}", report.download_label);
        println!("Upload:   {}", report.upload_label);
    }
    Ok(())
}

fn run_status(config: &Config) -> Result<()> {
    const RED: &str = "\x1b[0;31m";
    const GREEN: &str = "\x1b[0;32m";
    const BLUE: &str = "\x1b[0;34m";
    const BOLD: &str = "\x1b[1m";
    const DIM: &str = "\x1b[2m";
    const NC: &str = "\x1b[0m";

    let on_off = |enabled: bool| {
        if enabled {
            format!("{}[ON]{}", GREEN, NC)
        } else {
            format!("{}[OFF]{}", DIM, NC)
        }
    };

    let probe = HostProbe::new();
    let state = probe.snapshot()?;
    let route = probe
        .default_interface()?
        .unwrap_or_else(|| "none".to_string());

    println!();
    println!("{}{}┌─ Connectivity{}", BOLD, BLUE, NC);
    println!("{}│{}  Default route: {}", BLUE, NC, route);
    if state.has_internet {
        println!("{}│{}  Internet:      {}[CONNECTED]{}", BLUE, NC, GREEN, NC);
    } else {
        println!("{}│{}  Internet:      {}[OFFLINE]{}", BLUE, NC, RED, NC);
    }
    let transport = if state.is_wifi { "Wi-Fi" } else { "Wired/other" };
    println!("{}│{}  Transport:     {}", BLUE, NC, transport);
    if let Some(pct) = state.signal_percent {
        println!("{}│{}  Signal:        {}%", BLUE, NC, pct);
    }
    println!("{}└{}", BLUE, NC);
    println!();

    let power = PowerManager::new();
    let battery = power
        .battery_percentage()
        .map(|p| format!("{}%", p))
        .unwrap_or_else(|| "N/A".to_string());
    println!("{}{}┌─ Power{}", BOLD, BLUE, NC);
    println!("{}│{}  Source:   {:?} (Battery: {})", BLUE, NC, power.power_source(), battery);
    println!("{}│{}  Charging: {}", BLUE, NC, on_off(power.is_charging()));
    println!("{}└{}", BLUE, NC);
    println!();

    println!("{}{}┌─ Monitor{}", BOLD, BLUE, NC);
    println!("{}│{}  Tick:        {}ms", BLUE, NC, config.monitor.tick_ms);
    println!("{}│{}  Renderer:    {:?}", BLUE, NC, config.monitor.renderer);
    println!("{}│{}  Pause on:", BLUE, NC);
    println!("{}│{}    ├─ Screen saver: {}", BLUE, NC, on_off(config.pause.screensaver));
    println!("{}│{}    ├─ Sleep:        {}", BLUE, NC, on_off(config.pause.sleep));
    println!("{}│{}    └─ SIGUSR1/2:    {}", BLUE, NC, on_off(config.pause.signals));
    println!(
        "{}│{}  Background:  {} every {}s",
        BLUE, NC, on_off(config.background.enabled), config.background.interval_secs
    );
    println!("{}└{}", BLUE, NC);

    Ok(())
}
