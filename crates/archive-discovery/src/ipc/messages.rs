//! # Control Channel Messages
//!
//! Commands flow from the controller to the engine; events flow back.
//! Both serialize as `{"type": "<SCREAMING_SNAKE>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigPatch, DiscoveryConfig};
use crate::domain::{ProbeResult, StateSnapshot};

/// Controller → engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Load the client module.
    Init(InitRequest),
    /// Begin a run.
    Start,
    /// End the current run.
    Stop,
    /// Merge a configuration patch.
    Config(ConfigPatch),
    /// Request a snapshot.
    GetState,
    /// Clear the ledger (only while not running).
    Reset,
}

impl Command {
    /// Wire name of the command.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "INIT",
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Config(_) => "CONFIG",
            Self::GetState => "GET_STATE",
            Self::Reset => "RESET",
        }
    }
}

/// Every command type the wire codec accepts.
pub const COMMAND_TYPES: &[&str] = &["INIT", "START", "STOP", "CONFIG", "GET_STATE", "RESET"];

/// INIT payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    /// Which client module to load; empty selects the default.
    #[serde(default)]
    pub module_ref: String,
}

/// Engine → controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// Reply to INIT.
    Initialized(InitializedPayload),
    /// A run began.
    Started,
    /// A run ended.
    Stopped,
    /// The live configuration after a CONFIG.
    ConfigUpdated(ConfigUpdatedPayload),
    /// Ledger snapshot.
    StateUpdate(StateSnapshot),
    /// A node was confirmed archive.
    ArchiveFound(ProbeResult),
    /// Human-readable log line.
    Log(LogEntry),
    /// Command or initialization failure.
    Error(ErrorEntry),
}

impl Event {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "INITIALIZED",
            Self::Started => "STARTED",
            Self::Stopped => "STOPPED",
            Self::ConfigUpdated(_) => "CONFIG_UPDATED",
            Self::StateUpdate(_) => "STATE_UPDATE",
            Self::ArchiveFound(_) => "ARCHIVE_FOUND",
            Self::Log(_) => "LOG",
            Self::Error(_) => "ERROR",
        }
    }
}

/// INITIALIZED payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedPayload {
    /// Whether the module loaded.
    pub success: bool,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// CONFIG_UPDATED payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdatedPayload {
    /// Live configuration after the merge.
    pub config: DiscoveryConfig,
}

/// Severity of a LOG event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Progress.
    Info,
    /// Something completed.
    Success,
    /// Recoverable problem.
    Warning,
    /// Failure.
    Error,
    /// An archive node was found.
    Archive,
}

/// LOG payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Text.
    pub message: String,
    /// Severity.
    pub level: LogLevel,
    /// Unix milliseconds.
    pub timestamp: u64,
}

/// ERROR payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// What failed.
    pub message: String,
    /// Underlying error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix milliseconds.
    pub timestamp: u64,
}
