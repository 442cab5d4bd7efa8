//! # Inbound Ports
//!
//! API trait defining what a controller can ask of the discovery engine.
//!
//! Every call only enqueues a command; results arrive as events.

use async_trait::async_trait;

use crate::config::ConfigPatch;
use crate::domain::DiscoveryError;

/// Discovery engine API - inbound port.
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    /// Load the client module. Answered by INITIALIZED.
    async fn init(&self, module_ref: &str) -> Result<(), DiscoveryError>;

    /// Begin a run. Answered by STARTED.
    async fn start(&self) -> Result<(), DiscoveryError>;

    /// End the current run. Answered by STOPPED.
    async fn stop(&self) -> Result<(), DiscoveryError>;

    /// Merge a configuration patch. Answered by CONFIG_UPDATED or ERROR.
    async fn update_config(&self, patch: ConfigPatch) -> Result<(), DiscoveryError>;

    /// Request a snapshot. Answered by STATE_UPDATE.
    async fn get_state(&self) -> Result<(), DiscoveryError>;

    /// Clear the ledger while not running. Answered by STATE_UPDATE or ERROR.
    async fn reset(&self) -> Result<(), DiscoveryError>;
}
