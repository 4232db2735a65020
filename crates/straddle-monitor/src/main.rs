//! Live SPX straddle monitor - Entry Point

use anyhow::Result;
use clap::Parser;
use straddle_monitor::{AppConfig, Application, ConfigSource};
use tracing::{info, warn};

/// Live SPX straddle monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STRADDLE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any WS connection
    straddle_ws::init_crypto();

    let args = Args::parse();
    let config_path = AppConfig::resolve_path(args.config);

    // Logging settings live in the config, so it is loaded first.
    let (config, source) = AppConfig::load(&config_path)?;
    straddle_telemetry::init_logging_with(&config.telemetry.log_level, config.telemetry.json_logs)?;

    info!("Starting straddle monitor v{}", env!("CARGO_PKG_VERSION"));
    if source == ConfigSource::Defaults {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }
    info!(
        config_path = %config_path,
        upstream = %config.upstream.url,
        dashboard_port = config.dashboard.port,
        "Configuration loaded"
    );

    Application::new(config).run().await?;

    Ok(())
}
