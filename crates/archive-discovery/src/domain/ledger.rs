//! # Dedup & Stats Ledger
//!
//! Pure bookkeeping for a discovery engine: which identities were tested,
//! what was found, and the rolling sample of confirmed archive heights that
//! feeds the adaptive median-depth probe.
//!
//! The ledger is owned and mutated by the engine task alone. Observers get
//! copies via [`Ledger::snapshot`].

use std::collections::{HashSet, VecDeque};

use super::entities::{NodeIdentity, ProbeResult};
use super::invariants::DEFAULT_RECENT_HEIGHTS_CAPACITY;
use super::value_objects::{Counters, StateSnapshot};

/// Tested identities, archive records, height sample and counters.
#[derive(Debug, Clone)]
pub struct Ledger {
    tested_identities: HashSet<NodeIdentity>,
    archive_records: Vec<ProbeResult>,
    recent_archive_heights: VecDeque<u64>,
    heights_capacity: usize,
    counters: Counters,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_HEIGHTS_CAPACITY)
    }
}

impl Ledger {
    /// Create an empty ledger keeping at most `heights_capacity` archive heights.
    pub fn new(heights_capacity: usize) -> Self {
        Self {
            tested_identities: HashSet::new(),
            archive_records: Vec::new(),
            recent_archive_heights: VecDeque::new(),
            heights_capacity: heights_capacity.max(1),
            counters: Counters::default(),
        }
    }

    /// True iff dedup is enabled and `identity` was already classified.
    pub fn should_skip(&self, identity: &NodeIdentity, skip_duplicate_check: bool) -> bool {
        !skip_duplicate_check && self.tested_identities.contains(identity)
    }

    /// Count a duplicate candidate.
    pub fn record_skip(&mut self) {
        self.counters.skipped += 1;
    }

    /// Count a failed cycle.
    pub fn record_error(&mut self) {
        self.counters.errors += 1;
    }

    /// Record a fully classified node.
    pub fn record_result(&mut self, result: ProbeResult) {
        self.tested_identities.insert(result.identity.clone());
        self.counters.tested += 1;

        if result.classified_archive {
            self.counters.archive += 1;
            if self.recent_archive_heights.len() == self.heights_capacity {
                self.recent_archive_heights.pop_front();
            }
            self.recent_archive_heights.push_back(result.block_height);
            self.archive_records.push(result);
        } else {
            self.counters.non_archive += 1;
        }

        debug_assert!(self.counters.is_balanced());
    }

    /// Clear every identity, record and counter.
    pub fn reset(&mut self) {
        self.tested_identities.clear();
        self.archive_records.clear();
        self.recent_archive_heights.clear();
        self.counters = Counters::default();
    }

    /// Current counters.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Discovered archive nodes, in discovery order.
    pub fn archive_records(&self) -> &[ProbeResult] {
        &self.archive_records
    }

    /// Confirmed archive heights, oldest first.
    pub fn recent_archive_heights(&self) -> Vec<u64> {
        self.recent_archive_heights.iter().copied().collect()
    }

    #[cfg(test)]
    fn tested_identity_count(&self) -> usize {
        self.tested_identities.len()
    }

    /// Copy of the ledger for the controller.
    pub fn snapshot(&self, running: bool, index: u64) -> StateSnapshot {
        StateSnapshot {
            counters: self.counters,
            archive_records: self.archive_records.clone(),
            running,
            index,
        }
    }
}
