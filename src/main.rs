use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thinq_bridge::bridge::Bridge;
use thinq_bridge::config::PlatformConfig;
use thinq_bridge::device::load_fleet;
use thinq_bridge::error::Result;
use thinq_bridge::transport::SimulatedTransport;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Serve a ThinQ appliance fleet as HomeKit accessory state.
#[derive(Debug, Parser)]
#[command(name = "thinq-bridge", version, about)]
struct Args {
    /// Homebridge config.json or a bare platform block
    #[arg(long, env = "THINQ_CONFIG")]
    config: Option<PathBuf>,

    /// Device list to serve (JSON array of device records)
    #[arg(long, env = "THINQ_FIXTURES")]
    fixtures: PathBuf,

    /// Refresh interval in seconds, overrides the configuration
    #[arg(long, env = "THINQ_REFRESH_SECS")]
    interval: Option<u64>,

    /// Refresh once, print accessory state and exit
    #[arg(long)]
    once: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Load the platform configuration; a missing default file means no overrides.
fn load_config(path: Option<PathBuf>) -> Result<PlatformConfig> {
    match path {
        Some(path) => PlatformConfig::load(&path),
        None => match PlatformConfig::default_path().filter(|p| p.exists()) {
            Some(path) => PlatformConfig::load(&path),
            None => {
                warn!("[Config] No configuration found, using defaults");
                Ok(PlatformConfig::default())
            }
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config)?;
    let interval = Duration::from_secs(args.interval.unwrap_or(config.refresh_interval).max(1));
    info!("Configuration loaded:");
    info!("  Device overrides: {}", config.devices.len());
    info!("  Refresh interval: {:?}", interval);

    let devices = load_fleet(&args.fixtures)?;
    let transport = Arc::new(SimulatedTransport::new());
    for device in &devices {
        transport.insert_device(device.id.clone(), device.snapshot.clone());
    }

    let mut bridge = Bridge::new(transport, config.into_shared());
    let served = bridge.add_devices(devices);
    info!("Serving {} device(s)", served);

    if args.once {
        bridge.refresh().await;
        for state in bridge.accessory_states() {
            info!("{}: {} service(s)", state.name, state.services.len());
            for service in &state.services {
                info!("  {} {:?}", service.kind, service.characteristics);
            }
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown.cancel();
    });

    bridge.run(interval, cancel).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logger();
    info!("Starting ThinQ Bridge");

    if let Err(e) = run(Args::parse()).await {
        error!("ThinQ Bridge failed: {}", e);
        std::process::exit(1);
    }

    info!("ThinQ Bridge stopped");
}
