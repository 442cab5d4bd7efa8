//! # Domain Entities
//!
//! Candidates, their identities, and the results of probing them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate endpoint as yielded by the directory service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// Connection URL of the node.
    pub url: String,
    /// Directory-assigned identifier, when the service provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl NodeEndpoint {
    /// Create an endpoint without a directory uid.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            uid: None,
        }
    }

    /// Attach a directory uid.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Dedup identity of this endpoint.
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::from_url(&self.url)
    }
}

/// Stable dedup key of a probed node.
///
/// Derived only from the endpoint address. Two endpoints that differ only in
/// scheme/host case or a trailing slash map to the same identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    /// Normalize a URL into an identity.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim().trim_end_matches('/');
        let normalized = match trimmed.find("://") {
            Some(scheme_end) => {
                let authority_start = scheme_end + 3;
                let authority_end = trimmed[authority_start..]
                    .find('/')
                    .map(|i| authority_start + i)
                    .unwrap_or(trimmed.len());
                format!(
                    "{}{}",
                    trimmed[..authority_end].to_ascii_lowercase(),
                    &trimmed[authority_end..]
                )
            }
            None => trimmed.to_ascii_lowercase(),
        };
        Self(normalized)
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server metadata reported by a connected node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Node software version.
    pub server_version: Option<String>,
    /// Network the node serves (e.g. "mainnet").
    pub network_id: Option<String>,
}

impl ServerInfo {
    /// Label used in logs and results.
    pub fn label(&self) -> String {
        self.server_version
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Minimal view of a block returned by a historical query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Height the block was requested at.
    pub height: u64,
    /// Block hash, hex-encoded, when the node returns one.
    pub hash: Option<String>,
}

/// Outcome of the historical-depth verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalOutcome {
    /// Whether every planned probe succeeded.
    pub passed: bool,
    /// Which probe failed, at which height, and why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HistoricalOutcome {
    /// Passing outcome.
    pub fn passed() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    /// Failing outcome with a reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Fully classified probe of one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Dedup identity of the node.
    pub identity: NodeIdentity,
    /// Ordinal index the node was resolved at.
    pub index: u64,
    /// Chain height reported by the node.
    pub block_height: u64,
    /// Server label (software version or "Unknown").
    pub server_label: String,
    /// Network id reported by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    /// Final verdict.
    pub classified_archive: bool,
    /// Historical-depth verification outcome.
    pub historical_outcome: HistoricalOutcome,
}
