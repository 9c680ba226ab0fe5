//! WizFlow - Art-Net to WiZ smart bulb bridge
//!
//! The `run` command is what deployments use: a small controller process
//! that keeps the actual bridge engine (`bridge`) running as a child,
//! restarting it with exponential backoff if it dies. `discover` is the
//! operator tool for finding bulbs to configure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use wizflow_control::{discover, BridgeEngine, JsonFileStore, Supervisor};
use wizflow_core::{AppConfig, BridgeConfig};

mod logging_setup;

/// Art-Net to WiZ smart bulb bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bulb store path (overrides the configuration file)
    #[arg(short, long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the supervised bridge (restarts the engine if it crashes)
    Run,
    /// Run the bridge engine in the foreground (what `run` supervises)
    Bridge,
    /// Scan the LAN for WiZ bulbs and print what answers
    Discover {
        /// Collection window in milliseconds
        #[arg(long, value_name = "MS")]
        window: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(store) = &args.store {
        config.bridge.store_path = store.clone();
    }
    if args.verbose {
        config.log.level = "debug".to_string();
    }

    let _log_guard = logging_setup::init(&config.log)?;

    match &args.command {
        Command::Run => run_supervised(&args).await,
        Command::Bridge => run_bridge(config.bridge).await,
        Command::Discover { window } => {
            let window = (*window).unwrap_or(config.bridge.discovery_window_ms);
            run_discovery(Duration::from_millis(window), config.bridge.wiz_port).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config file {:?}", path))
}

/// Re-launch ourselves as `wizflow bridge ...` under supervision.
async fn run_supervised(args: &Args) -> Result<()> {
    let exe = std::env::current_exe().context("cannot locate own executable")?;

    let mut child_args = vec!["bridge".to_string()];
    if let Some(path) = &args.config {
        child_args.push("--config".to_string());
        child_args.push(path.display().to_string());
    }
    if let Some(path) = &args.store {
        child_args.push("--store".to_string());
        child_args.push(path.display().to_string());
    }
    if args.verbose {
        child_args.push("--verbose".to_string());
    }

    let mut supervisor = Supervisor::new(exe, child_args);
    supervisor.start();
    info!("supervisor running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    supervisor.stop().await;

    let status = supervisor.status();
    info!("stopped after {} restart(s)", status.restarts);
    Ok(())
}

async fn run_bridge(config: BridgeConfig) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(&config.store_path));
    let engine = BridgeEngine::bind(config, store).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await?;
    Ok(())
}

async fn run_discovery(window: Duration, wiz_port: u16) -> Result<()> {
    eprintln!("scanning for {} ms...", window.as_millis());
    let found = discover(window, wiz_port).await?;

    if found.is_empty() {
        println!("no bulbs answered");
        return Ok(());
    }
    for bulb in &found {
        let dimming = bulb
            .result
            .dimming
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let rssi = bulb
            .result
            .rssi
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        println!(
            "{}  {:<15}  state={}  dimming={}  rssi={}",
            bulb.mac,
            bulb.ip,
            if bulb.result.state { "on" } else { "off" },
            dimming,
            rssi,
        );
    }
    Ok(())
}
