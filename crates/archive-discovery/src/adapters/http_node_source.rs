//! # HTTP Node Source
//!
//! Directory service adapter. The directory answers a GET with a JSON array
//! of `{url, uid?}` entries.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::{DiscoveryError, NodeEndpoint};
use crate::ports::{NodeSource, NodeSourceFactory};

/// Opens [`HttpNodeSource`] handles sharing one HTTP client.
#[derive(Clone, Debug)]
pub struct HttpNodeSourceFactory {
    client: Client,
}

impl HttpNodeSourceFactory {
    /// Factory over `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeSourceFactory for HttpNodeSourceFactory {
    async fn open(&self, url: &str) -> Result<Box<dyn NodeSource>, DiscoveryError> {
        let mut source = HttpNodeSource {
            client: self.client.clone(),
            url: url.to_string(),
            listing: Vec::new(),
        };
        source.refresh().await?;
        Ok(Box::new(source))
    }
}

/// Cached directory listing.
#[derive(Debug)]
pub struct HttpNodeSource {
    client: Client,
    url: String,
    listing: Vec<NodeEndpoint>,
}

impl HttpNodeSource {
    async fn refresh(&mut self) -> Result<(), DiscoveryError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DiscoveryError::NodeSource(format!("{}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DiscoveryError::NodeSource(format!(
                "{} answered {status}",
                self.url
            )));
        }

        self.listing = resp
            .json::<Vec<NodeEndpoint>>()
            .await
            .map_err(|e| DiscoveryError::NodeSource(format!("malformed listing: {e}")))?;
        debug!(
            url = %self.url,
            nodes = self.listing.len(),
            "[archive-discovery] directory listing refreshed"
        );
        Ok(())
    }

    fn cached(&self, index: u64) -> Option<NodeEndpoint> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.listing.get(i).cloned())
    }
}

#[async_trait]
impl NodeSource for HttpNodeSource {
    async fn endpoint_at(&mut self, index: u64) -> Result<Option<NodeEndpoint>, DiscoveryError> {
        if let Some(endpoint) = self.cached(index) {
            return Ok(Some(endpoint));
        }
        // Past the cache: the directory may have grown since the last fetch.
        self.refresh().await?;
        Ok(self.cached(index))
    }
}
