//! HTTP client module loader.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::http_node_source::HttpNodeSourceFactory;
use super::json_rpc::JsonRpcClientFactory;
use crate::domain::DiscoveryError;
use crate::ports::{ClientCapabilities, ClientModuleLoader};

/// Network selected by an empty module ref.
pub const DEFAULT_NETWORK_ID: &str = "mainnet";

/// Loads the reqwest-backed directory and JSON-RPC adapters.
///
/// The module ref names the network (`mainnet`, `testnet-10`, ...).
#[derive(Clone, Debug)]
pub struct HttpClientModule {
    request_timeout: Duration,
}

impl Default for HttpClientModule {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl HttpClientModule {
    /// Loader whose HTTP client times requests out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl ClientModuleLoader for HttpClientModule {
    async fn load(&self, module_ref: &str) -> Result<ClientCapabilities, DiscoveryError> {
        let network_id = match module_ref.trim() {
            "" => DEFAULT_NETWORK_ID,
            other => other,
        };

        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| DiscoveryError::Initialization(format!("http client: {e}")))?;

        info!(network_id, "[archive-discovery] http client module loaded");
        Ok(ClientCapabilities::new(
            Arc::new(HttpNodeSourceFactory::new(client.clone())),
            Arc::new(JsonRpcClientFactory::new(client, network_id)),
        ))
    }
}
