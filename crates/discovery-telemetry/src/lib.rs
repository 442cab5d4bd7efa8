//! # Discovery Telemetry
//!
//! Logging and metrics for archive discovery hosts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use discovery_telemetry::{init_telemetry, observe, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::from_env())?;
//! while let Some(event) = events.recv().await {
//!     observe(&event);
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AD_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `AD_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `AD_METRICS` | `true` | Register Prometheus metrics |
//! | `AD_SERVICE_NAME` | `archive-scout` | Service name |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{
    encode_metrics, observe, register_metrics, ARCHIVE_FOUND, CYCLE_ERRORS, EVENTS,
    NODES_ARCHIVE, NODES_NON_ARCHIVE, NODES_SKIPPED, NODES_TESTED, NODE_INDEX, REGISTRY, RUNNING,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Global subscriber could not be installed
    #[error("Failed to initialize tracing subscriber: {0}")]
    Subscriber(String),

    /// Metric registration or encoding failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Log filter or other setting is malformed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and, if enabled, metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    init_logging(config)
}
