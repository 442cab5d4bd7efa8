//! # Historical Depth Planning
//!
//! Chooses which past heights to query when verifying that a node retains
//! history.
//!
//! Two probes are planned: a fixed-depth probe one day of blocks back, and
//! an adaptive probe at half the median height of confirmed archive nodes.

use std::fmt;

use crate::domain::FIXED_PROBE_DEPTH;

/// Which historical probe a target belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoricalProbeKind {
    /// `FIXED_PROBE_DEPTH` blocks below the tip.
    FixedDepth,
    /// Half the median archive height below the tip.
    MedianDepth,
}

impl fmt::Display for HistoricalProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedDepth => f.write_str("fixed-depth"),
            Self::MedianDepth => f.write_str("median-depth"),
        }
    }
}

/// A planned historical query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoricalProbe {
    /// Probe the target belongs to.
    pub kind: HistoricalProbeKind,
    /// Height to query.
    pub target_height: u64,
}

/// Median of a height sample.
///
/// Even-length samples average the two middle elements, rounding down.
/// Returns `None` for an empty sample.
pub fn median_height(heights: &[u64]) -> Option<u64> {
    if heights.is_empty() {
        return None;
    }

    let mut sorted = heights.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Some(sorted[mid]);
    }

    let (lo, hi) = (sorted[mid - 1], sorted[mid]);
    // midpoint without overflow
    Some(lo + (hi - lo) / 2)
}

/// Depth of the adaptive probe: half the median, floored.
pub fn median_depth(heights: &[u64]) -> Option<u64> {
    median_height(heights).map(|median| median / 2)
}

/// Plan historical probes for a candidate at `block_height`.
///
/// Probes whose depth is not strictly below the tip are dropped. The fixed
/// probe always precedes the median probe.
pub fn plan_historical_probes(block_height: u64, recent_heights: &[u64]) -> Vec<HistoricalProbe> {
    let mut plan = Vec::with_capacity(2);

    if block_height > FIXED_PROBE_DEPTH {
        plan.push(HistoricalProbe {
            kind: HistoricalProbeKind::FixedDepth,
            target_height: block_height - FIXED_PROBE_DEPTH,
        });
    }

    if let Some(depth) = median_depth(recent_heights) {
        if block_height > depth {
            plan.push(HistoricalProbe {
                kind: HistoricalProbeKind::MedianDepth,
                target_height: block_height - depth,
            });
        }
    }

    plan
}
