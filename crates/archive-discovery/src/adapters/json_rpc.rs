//! # JSON-RPC Chain Client
//!
//! Client session speaking JSON-RPC 2.0 over HTTP POST.
//!
//! | Port call | Method | Reply used |
//! |-----------|--------|------------|
//! | `connect` | `ping` | any result |
//! | `server_info` | `getServerInfo` | `serverVersion`, `networkId` |
//! | `chain_height` | `getBlockDagInfo` | `blockCount`, else `virtualDaaScore` |
//! | `block_at` | `getBlock` | `null` means missing |

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{BlockSummary, DiscoveryError, NodeEndpoint, ServerInfo};
use crate::ports::{ChainClient, ChainClientFactory};

/// Creates [`JsonRpcChainClient`] sessions.
#[derive(Clone, Debug)]
pub struct JsonRpcClientFactory {
    client: Client,
    network_id: String,
}

impl JsonRpcClientFactory {
    /// Factory for sessions on `network_id`.
    pub fn new(client: Client, network_id: impl Into<String>) -> Self {
        Self {
            client,
            network_id: network_id.into(),
        }
    }
}

impl ChainClientFactory for JsonRpcClientFactory {
    fn create(&self, endpoint: &NodeEndpoint) -> Result<Box<dyn ChainClient>, DiscoveryError> {
        Ok(Box::new(JsonRpcChainClient {
            client: self.client.clone(),
            endpoint: endpoint.url.clone(),
            rpc_url: rpc_url(&endpoint.url),
            network_id: self.network_id.clone(),
            next_id: 1,
        }))
    }
}

/// Map websocket endpoints onto their HTTP equivalents.
fn rpc_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// One JSON-RPC session.
#[derive(Debug)]
pub struct JsonRpcChainClient {
    client: Client,
    endpoint: String,
    rpc_url: String,
    network_id: String,
    next_id: u64,
}

impl JsonRpcChainClient {
    async fn call(&mut self, method: &str, params: Value) -> Result<Value, DiscoveryError> {
        let id = self.next_id;
        self.next_id += 1;

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(endpoint = %self.endpoint, method, id, "[archive-discovery] rpc call");

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DiscoveryError::connection(&self.endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DiscoveryError::protocol(
                &self.endpoint,
                format!("{method} answered {status}"),
            ));
        }

        let reply: RpcReply = resp
            .json()
            .await
            .map_err(|e| DiscoveryError::protocol(&self.endpoint, format!("{method}: {e}")))?;

        if let Some(err) = reply.error {
            return Err(DiscoveryError::protocol(
                &self.endpoint,
                format!("{method} error {}: {}", err.code, err.message),
            ));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

fn parse_height(endpoint: &str, info: &Value) -> Result<u64, DiscoveryError> {
    ["blockCount", "virtualDaaScore"]
        .iter()
        .find_map(|field| match info.get(*field) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        })
        .ok_or_else(|| DiscoveryError::protocol(endpoint, "getBlockDagInfo carries no height"))
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&mut self) -> Result<(), DiscoveryError> {
        self.call("ping", json!({})).await.map(|_| ())
    }

    async fn server_info(&mut self) -> Result<ServerInfo, DiscoveryError> {
        let value = self.call("getServerInfo", json!({})).await?;
        let mut info: ServerInfo = serde_json::from_value(value)
            .map_err(|e| DiscoveryError::protocol(&self.endpoint, format!("getServerInfo: {e}")))?;
        if info.network_id.is_none() {
            info.network_id = Some(self.network_id.clone());
        }
        Ok(info)
    }

    async fn chain_height(&mut self) -> Result<u64, DiscoveryError> {
        let value = self.call("getBlockDagInfo", json!({})).await?;
        parse_height(&self.endpoint, &value)
    }

    async fn block_at(&mut self, height: u64) -> Result<Option<BlockSummary>, DiscoveryError> {
        let value = self
            .call(
                "getBlock",
                json!({"height": height, "includeTransactions": false}),
            )
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let hash = value
            .get("hash")
            .or_else(|| value.pointer("/header/hash"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Some(BlockSummary { height, hash }))
    }

    async fn close(&mut self) -> Result<(), DiscoveryError> {
        // Stateless transport; nothing to release beyond the pooled client.
        Ok(())
    }
}
