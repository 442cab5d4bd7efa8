//! # Domain Invariants
//!
//! Protocol constants and the ledger rules that must always hold.

use super::value_objects::Counters;

/// Depth of the fixed historical probe (roughly one day of blocks).
pub const FIXED_PROBE_DEPTH: u64 = 864_000;

/// Default block-height cutoff for the archive heuristic.
pub const DEFAULT_ARCHIVE_THRESHOLD: u64 = 50_000_000;

/// Connect step timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Flat pause after a failed cycle. Longer than the default pacing interval.
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 5_000;

/// A STATE_UPDATE is emitted every this many classified nodes.
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 10;

/// Capacity of the confirmed-archive height sample.
pub const DEFAULT_RECENT_HEIGHTS_CAPACITY: usize = 1024;

/// Invariant: every tested node is classified exactly once.
pub fn invariant_counters_balanced(counters: &Counters) -> Result<(), String> {
    if counters.is_balanced() {
        return Ok(());
    }
    Err(format!(
        "tested ({}) != archive ({}) + nonArchive ({})",
        counters.tested, counters.archive, counters.non_archive
    ))
}

/// Invariant: the archive record list mirrors the archive counter.
pub fn invariant_archive_records(counters: &Counters, record_count: usize) -> Result<(), String> {
    if counters.archive == record_count as u64 {
        return Ok(());
    }
    Err(format!(
        "archive counter ({}) != archive records ({})",
        counters.archive, record_count
    ))
}
