//! # Outbound Ports
//!
//! Capabilities the engine consumes: the directory service, the blockchain
//! client library, and a clock. Adapters live in `crate::adapters`; scripted
//! mocks in `crate::testing`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{BlockSummary, DiscoveryError, NodeEndpoint, ServerInfo};

/// Directory handle yielding candidates by ordinal index - outbound port.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Endpoint at `index`, or `None` when the directory is exhausted.
    async fn endpoint_at(&mut self, index: u64) -> Result<Option<NodeEndpoint>, DiscoveryError>;
}

/// Opens directory handles - outbound port.
#[async_trait]
pub trait NodeSourceFactory: Send + Sync {
    /// Open a handle against the directory at `url`.
    async fn open(&self, url: &str) -> Result<Box<dyn NodeSource>, DiscoveryError>;
}

/// One client session against a candidate node - outbound port.
///
/// A session is used for exactly one probe and must be closed afterwards.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Endpoint this session targets (for logging).
    fn endpoint(&self) -> &str;

    /// Establish the connection.
    async fn connect(&mut self) -> Result<(), DiscoveryError>;

    /// Server version and network.
    async fn server_info(&mut self) -> Result<ServerInfo, DiscoveryError>;

    /// Current chain height.
    async fn chain_height(&mut self) -> Result<u64, DiscoveryError>;

    /// Block at `height`, `None` if the node does not have it.
    async fn block_at(&mut self, height: u64) -> Result<Option<BlockSummary>, DiscoveryError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), DiscoveryError>;
}

/// Creates client sessions - outbound port.
pub trait ChainClientFactory: Send + Sync {
    /// Create an unconnected session for `endpoint`.
    fn create(&self, endpoint: &NodeEndpoint) -> Result<Box<dyn ChainClient>, DiscoveryError>;
}

/// What a loaded client module provides.
#[derive(Clone)]
pub struct ClientCapabilities {
    /// Directory handle factory.
    pub node_sources: Arc<dyn NodeSourceFactory>,
    /// Client session factory.
    pub chain_clients: Arc<dyn ChainClientFactory>,
}

impl ClientCapabilities {
    /// Bundle the two factories.
    pub fn new(
        node_sources: Arc<dyn NodeSourceFactory>,
        chain_clients: Arc<dyn ChainClientFactory>,
    ) -> Self {
        Self {
            node_sources,
            chain_clients,
        }
    }
}

impl std::fmt::Debug for ClientCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCapabilities").finish_non_exhaustive()
    }
}

/// Loads the blockchain client module on INIT - outbound port.
#[async_trait]
pub trait ClientModuleLoader: Send + Sync {
    /// Load the module named by `module_ref`.
    async fn load(&self, module_ref: &str) -> Result<ClientCapabilities, DiscoveryError>;
}

/// Wall clock for event timestamps - outbound port.
pub trait TimeSource: Send + Sync {
    /// Unix time in milliseconds.
    fn now_millis(&self) -> u64;
}
