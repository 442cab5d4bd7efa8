//! # Discovery Configuration
//!
//! Tunables of the discovery engine.
//!
//! [`DiscoveryConfig`] is the live, patchable record; the engine hands each
//! cycle a clone so a CONFIG arriving mid-run applies from the next cycle.
//! [`EngineSettings`] are fixed when the engine is spawned.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{
    DiscoveryError, DEFAULT_ARCHIVE_THRESHOLD, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_ERROR_BACKOFF_MS, DEFAULT_RECENT_HEIGHTS_CAPACITY, DEFAULT_SNAPSHOT_INTERVAL,
};

/// Default directory service.
pub const DEFAULT_NODE_SOURCE_URL: &str = "https://kaspa.stream";

/// Default pause between cycles.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 2_000;

/// Default per-run node budget.
pub const DEFAULT_MAX_NODES: u64 = 10_000;

/// Live discovery configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// Directory service the node source is opened from.
    pub node_source_url: String,

    /// Pause after a successful (or no-op) cycle.
    pub probe_interval_ms: u64,

    /// Maximum ordinal index per run.
    pub max_nodes: u64,

    /// Block-height cutoff for the archive heuristic.
    pub archive_threshold: u64,

    /// Run historical-depth probes on nodes above the threshold.
    pub verify_historical_depth: bool,

    /// Disable identity dedup.
    pub skip_duplicate_check: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            node_source_url: DEFAULT_NODE_SOURCE_URL.to_string(),
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            max_nodes: DEFAULT_MAX_NODES,
            archive_threshold: DEFAULT_ARCHIVE_THRESHOLD,
            verify_historical_depth: true,
            skip_duplicate_check: false,
        }
    }
}

impl DiscoveryConfig {
    /// Create a config for testing (short pacing, small budget).
    pub fn for_testing() -> Self {
        Self {
            node_source_url: "mock://directory".to_string(),
            probe_interval_ms: 10,
            max_nodes: 100,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AD_NODE_SOURCE_URL`: Directory service (default: https://kaspa.stream)
    /// - `AD_PROBE_INTERVAL_MS`: Pacing interval (default: 2000)
    /// - `AD_MAX_NODES`: Node budget per run (default: 10000)
    /// - `AD_ARCHIVE_THRESHOLD`: Archive height cutoff (default: 50000000)
    /// - `AD_VERIFY_HISTORICAL_DEPTH`: Historical probes (default: true)
    /// - `AD_SKIP_DUPLICATE_CHECK`: Disable dedup (default: false)
    ///
    /// Unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_source_url: env::var("AD_NODE_SOURCE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.node_source_url),
            probe_interval_ms: env_parse("AD_PROBE_INTERVAL_MS")
                .unwrap_or(defaults.probe_interval_ms),
            max_nodes: env_parse("AD_MAX_NODES").unwrap_or(defaults.max_nodes),
            archive_threshold: env_parse("AD_ARCHIVE_THRESHOLD")
                .unwrap_or(defaults.archive_threshold),
            verify_historical_depth: env_flag("AD_VERIFY_HISTORICAL_DEPTH")
                .unwrap_or(defaults.verify_historical_depth),
            skip_duplicate_check: env_flag("AD_SKIP_DUPLICATE_CHECK")
                .unwrap_or(defaults.skip_duplicate_check),
        }
    }

    /// Apply a patch. Nothing changes if the patch is invalid.
    pub fn apply(&mut self, patch: &ConfigPatch) -> Result<(), DiscoveryError> {
        patch.validate()?;
        *self = patch.merge(self);
        Ok(())
    }

    /// Pacing interval as a [`Duration`].
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

/// Partial configuration update. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    /// New directory service URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_source_url: Option<String>,
    /// New pacing interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval_ms: Option<u64>,
    /// New node budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<u64>,
    /// New archive threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_threshold: Option<u64>,
    /// Toggle historical verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_historical_depth: Option<bool>,
    /// Toggle dedup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_duplicate_check: Option<bool>,
}

impl ConfigPatch {
    /// Reject patches that would leave the engine unusable.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if let Some(url) = &self.node_source_url {
            if url.trim().is_empty() {
                return Err(DiscoveryError::InvalidConfig(
                    "nodeSourceUrl must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Shallow merge onto `base`, returning the new config.
    pub fn merge(&self, base: &DiscoveryConfig) -> DiscoveryConfig {
        DiscoveryConfig {
            node_source_url: self
                .node_source_url
                .clone()
                .unwrap_or_else(|| base.node_source_url.clone()),
            probe_interval_ms: self.probe_interval_ms.unwrap_or(base.probe_interval_ms),
            max_nodes: self.max_nodes.unwrap_or(base.max_nodes),
            archive_threshold: self.archive_threshold.unwrap_or(base.archive_threshold),
            verify_historical_depth: self
                .verify_historical_depth
                .unwrap_or(base.verify_historical_depth),
            skip_duplicate_check: self
                .skip_duplicate_check
                .unwrap_or(base.skip_duplicate_check),
        }
    }
}

impl From<&DiscoveryConfig> for ConfigPatch {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            node_source_url: Some(config.node_source_url.clone()),
            probe_interval_ms: Some(config.probe_interval_ms),
            max_nodes: Some(config.max_nodes),
            archive_threshold: Some(config.archive_threshold),
            verify_historical_depth: Some(config.verify_historical_depth),
            skip_duplicate_check: Some(config.skip_duplicate_check),
        }
    }
}

/// Construction-time engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Connect step timeout.
    pub connect_timeout: Duration,
    /// Flat pause after a failed cycle; the pacing interval wins if longer.
    pub error_backoff: Duration,
    /// Emit a STATE_UPDATE every this many classified nodes.
    pub snapshot_interval: u64,
    /// Capacity of the confirmed-archive height sample.
    pub recent_heights_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            error_backoff: Duration::from_millis(DEFAULT_ERROR_BACKOFF_MS),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            recent_heights_capacity: DEFAULT_RECENT_HEIGHTS_CAPACITY,
        }
    }
}

impl EngineSettings {
    /// Create settings for testing (short timeouts).
    pub fn for_testing() -> Self {
        Self {
            connect_timeout: Duration::from_millis(100),
            error_backoff: Duration::from_millis(50),
            ..Self::default()
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    match env::var(key).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
