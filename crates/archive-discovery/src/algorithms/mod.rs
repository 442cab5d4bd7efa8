//! # Algorithms Module
//!
//! Pure planning logic behind the archive classifier.

pub mod depth;

pub use depth::{
    median_depth, median_height, plan_historical_probes, HistoricalProbe, HistoricalProbeKind,
};
