//! # Probe Executor
//!
//! Resolves candidates from the directory and runs one client session per
//! candidate.
//!
//! The directory handle is opened lazily, reused across cycles, and dropped
//! after any failure so the next cycle starts from a fresh one. Sessions are
//! closed on every path out of [`ProbeExecutor::probe`].

use std::time::Duration;
use tracing::{debug, warn};

use super::classifier::ArchiveClassifier;
use crate::domain::{DiscoveryError, NodeEndpoint, ProbeResult};
use crate::ports::{ChainClient, ClientCapabilities, NodeSource};

struct OpenSource {
    url: String,
    handle: Box<dyn NodeSource>,
}

/// Runs the per-candidate probing protocol.
pub struct ProbeExecutor {
    capabilities: ClientCapabilities,
    connect_timeout: Duration,
    source: Option<OpenSource>,
}

impl ProbeExecutor {
    /// Executor over the loaded client capabilities.
    pub fn new(capabilities: ClientCapabilities, connect_timeout: Duration) -> Self {
        Self {
            capabilities,
            connect_timeout,
            source: None,
        }
    }

    #[cfg(test)]
    fn has_open_source(&self) -> bool {
        self.source.is_some()
    }

    /// Resolve the candidate at `index` from the directory at `source_url`.
    ///
    /// `Ok(None)` means the directory is exhausted.
    pub async fn resolve(
        &mut self,
        source_url: &str,
        index: u64,
    ) -> Result<Option<NodeEndpoint>, DiscoveryError> {
        if self.source.as_ref().map(|s| s.url.as_str()) != Some(source_url) {
            if self.source.is_some() {
                debug!(url = source_url, "[archive-discovery] node source changed, reopening");
            }
            self.source = None;
            let handle = self
                .capabilities
                .node_sources
                .open(source_url)
                .await
                .map_err(as_source_error)?;
            self.source = Some(OpenSource {
                url: source_url.to_string(),
                handle,
            });
        }

        let Some(source) = self.source.as_mut() else {
            return Err(DiscoveryError::NodeSource("node source not open".into()));
        };

        match source.handle.endpoint_at(index).await {
            Ok(endpoint) => Ok(endpoint),
            Err(e) => {
                warn!(index, error = %e, "[archive-discovery] discarding node source handle");
                self.source = None;
                Err(as_source_error(e))
            }
        }
    }

    /// Probe `endpoint` and classify it.
    pub async fn probe(
        &self,
        endpoint: &NodeEndpoint,
        index: u64,
        classifier: &ArchiveClassifier,
        recent_heights: &[u64],
    ) -> Result<ProbeResult, DiscoveryError> {
        let mut client = self
            .capabilities
            .chain_clients
            .create(endpoint)
            .map_err(|e| match e {
                e if e.is_node_failure() => e,
                other => DiscoveryError::connection(&endpoint.url, other),
            })?;

        let result = self
            .run_session(client.as_mut(), endpoint, index, classifier, recent_heights)
            .await;

        if let Err(e) = client.close().await {
            debug!(endpoint = %endpoint.url, error = %e, "[archive-discovery] session close failed");
        }

        result
    }

    async fn run_session(
        &self,
        client: &mut dyn ChainClient,
        endpoint: &NodeEndpoint,
        index: u64,
        classifier: &ArchiveClassifier,
        recent_heights: &[u64],
    ) -> Result<ProbeResult, DiscoveryError> {
        match tokio::time::timeout(self.connect_timeout, client.connect()).await {
            Ok(connected) => connected?,
            Err(_) => {
                return Err(DiscoveryError::ConnectTimeout {
                    endpoint: endpoint.url.clone(),
                    timeout_ms: u64::try_from(self.connect_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            }
        }

        let info = client.server_info().await?;
        let block_height = client.chain_height().await?;
        debug!(
            endpoint = %endpoint.url,
            block_height,
            server = %info.label(),
            "[archive-discovery] connected"
        );

        let (classified_archive, historical_outcome) = classifier
            .classify(block_height, recent_heights, client)
            .await;

        Ok(ProbeResult {
            identity: endpoint.identity(),
            index,
            block_height,
            server_label: info.label(),
            network_id: info.network_id,
            classified_archive,
            historical_outcome,
        })
    }
}

fn as_source_error(e: DiscoveryError) -> DiscoveryError {
    match e {
        DiscoveryError::NodeSource(_) => e,
        other => DiscoveryError::NodeSource(other.to_string()),
    }
}
