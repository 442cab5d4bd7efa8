//! # Value Objects
//!
//! Run state, counters and snapshots.

use super::entities::ProbeResult;
use serde::{Deserialize, Serialize};

/// Run state of the discovery scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Not started yet.
    #[default]
    Idle,
    /// Cycle loop active.
    Running,
    /// Stop requested, waiting for the in-flight cycle.
    Stopping,
    /// Run finished (explicit STOP or budget exhausted).
    Stopped,
}

impl RunState {
    /// True while the cycle loop should keep going.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Ledger counters.
///
/// `tested == archive + non_archive` always holds; skipped and errored
/// cycles are counted separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    /// Nodes fully classified.
    pub tested: u64,
    /// Nodes classified archive.
    pub archive: u64,
    /// Nodes classified non-archive.
    pub non_archive: u64,
    /// Candidates skipped as duplicates.
    pub skipped: u64,
    /// Cycles that failed.
    pub errors: u64,
}

impl Counters {
    /// Check the tested/archive/non-archive balance.
    pub fn is_balanced(&self) -> bool {
        self.tested == self.archive + self.non_archive
    }
}

/// Point-in-time copy of the ledger surfaced to the controller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Ledger counters.
    pub counters: Counters,
    /// Discovered archive nodes, in discovery order.
    pub archive_records: Vec<ProbeResult>,
    /// Whether a run is active.
    pub running: bool,
    /// Current ordinal index.
    pub index: u64,
}
