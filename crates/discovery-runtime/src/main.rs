//! # Archive Scout
//!
//! Runs the archive discovery engine against the configured directory.
//!
//! See `discovery_runtime` for the control modes and
//! `DiscoveryConfig::from_env` for the tunables.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use archive_discovery::{
    spawn_engine, DiscoveryController, EngineSettings, HttpClientModule, SystemTimeSource,
};
use discovery_runtime::{load_config, run_auto, run_stdio, ControlMode};
use discovery_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and metrics
    init_telemetry(&TelemetryConfig::from_env())?;

    // Load configuration
    let config = load_config()?;
    info!(
        mode = ?config.mode,
        source = %config.discovery.node_source_url,
        max_nodes = config.discovery.max_nodes,
        version = archive_discovery::VERSION,
        "Starting archive scout"
    );

    let (handle, events) = spawn_engine(
        Arc::new(HttpClientModule::default()),
        config.discovery.clone(),
        EngineSettings::default(),
        Arc::new(SystemTimeSource),
    );

    match config.mode {
        ControlMode::Auto => run_auto(DiscoveryController::new(handle, events), config).await?,
        ControlMode::Stdio => run_stdio(handle, events).await?,
    }

    if let Ok(metrics) = discovery_telemetry::encode_metrics() {
        tracing::debug!(%metrics, "Final metrics");
    }
    info!("Shutdown complete");
    Ok(())
}
