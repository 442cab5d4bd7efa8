//! # Domain Errors
//!
//! Error taxonomy for the discovery engine.
//!
//! Only `Initialization` is fatal, and only to the INIT command. Every other
//! variant is contained within a single discovery cycle or a single command.

use thiserror::Error;

/// Discovery engine error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Client module failed to load or produce its capabilities.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Candidate could not be reached.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection {
        /// Endpoint that was being contacted
        endpoint: String,
        /// Underlying failure
        reason: String,
    },

    /// Connect step did not finish within the connection timeout.
    #[error("Connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// Endpoint that was being contacted
        endpoint: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// Client capability returned an unexpected or missing shape.
    #[error("Protocol error from {endpoint}: {reason}")]
    Protocol {
        /// Endpoint that produced the reply
        endpoint: String,
        /// What was wrong with it
        reason: String,
    },

    /// Directory service handle failed.
    #[error("Node source error: {0}")]
    NodeSource(String),

    /// A configuration patch was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wire message carried an unrecognized command type.
    #[error("Unknown command type: {0}")]
    UnknownCommand(String),

    /// Wire message could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Command is not allowed in the current run state.
    #[error("Command rejected: {0}")]
    InvalidState(String),

    /// The engine task is gone.
    #[error("Control channel closed")]
    ChannelClosed,
}

impl DiscoveryError {
    /// True for failures attributable to a single candidate node.
    pub fn is_node_failure(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectTimeout { .. } | Self::Protocol { .. }
        )
    }

    /// Shorthand for a connection error.
    pub fn connection(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a protocol error.
    pub fn protocol(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Protocol {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}
