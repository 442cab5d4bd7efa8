//! # Discovery Scheduler
//!
//! Run state machine, per-run node index, and the deadline of the next
//! cycle.

use std::time::Duration;
use tokio::time::Instant;

use crate::domain::RunState;

/// Owns the run state and cycle pacing.
#[derive(Debug, Default)]
pub struct DiscoveryScheduler {
    state: RunState,
    index: u64,
    next_cycle_at: Option<Instant>,
}

impl DiscoveryScheduler {
    /// Idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Ordinal index of the next candidate.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Deadline of the next cycle, if one is scheduled.
    pub fn next_cycle_at(&self) -> Option<Instant> {
        self.next_cycle_at
    }

    /// Begin a run with the first cycle due at `now`.
    ///
    /// Returns `false` and changes nothing if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state.is_running() {
            return false;
        }
        self.state = RunState::Running;
        self.index = 0;
        self.next_cycle_at = Some(now);
        true
    }

    /// Request a cooperative stop.
    ///
    /// Returns `false` if not running.
    pub fn request_stop(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.state = RunState::Stopping;
        self.next_cycle_at = None;
        true
    }

    /// Complete a stop once no cycle is in flight.
    pub fn finish_stop(&mut self) {
        self.state = RunState::Stopped;
        self.next_cycle_at = None;
    }

    /// Move to the next ordinal.
    pub fn advance(&mut self) {
        self.index += 1;
    }

    /// Schedule the next cycle `pause` after `now`. Ignored unless running.
    pub fn schedule_after(&mut self, now: Instant, pause: Duration) {
        if self.state.is_running() {
            self.next_cycle_at = Some(now + pause);
        }
    }

    /// True once the per-run budget is used up.
    pub fn budget_exhausted(&self, max_nodes: u64) -> bool {
        self.index >= max_nodes
    }
}
