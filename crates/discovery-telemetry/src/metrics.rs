//! Prometheus metrics for the discovery engine.
//!
//! All metrics follow the naming convention: `ad_<area>_<metric>[_unit]`
//!
//! Ledger totals are gauges because a RESET sets them back to zero; they
//! mirror the latest STATE_UPDATE. Event counts are true counters.

use archive_discovery::{Event, StateSnapshot};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER TOTALS (mirrored from STATE_UPDATE)
    // =========================================================================

    /// Nodes fully classified
    pub static ref NODES_TESTED: IntGauge = IntGauge::new(
        "ad_ledger_nodes_tested",
        "Nodes fully classified in the current ledger"
    ).expect("metric creation failed");

    /// Nodes classified archive
    pub static ref NODES_ARCHIVE: IntGauge = IntGauge::new(
        "ad_ledger_nodes_archive",
        "Nodes classified archive in the current ledger"
    ).expect("metric creation failed");

    /// Nodes classified non-archive
    pub static ref NODES_NON_ARCHIVE: IntGauge = IntGauge::new(
        "ad_ledger_nodes_non_archive",
        "Nodes classified non-archive in the current ledger"
    ).expect("metric creation failed");

    /// Candidates skipped as duplicates
    pub static ref NODES_SKIPPED: IntGauge = IntGauge::new(
        "ad_ledger_nodes_skipped",
        "Duplicate candidates skipped in the current ledger"
    ).expect("metric creation failed");

    /// Failed cycles
    pub static ref CYCLE_ERRORS: IntGauge = IntGauge::new(
        "ad_ledger_cycle_errors",
        "Failed cycles in the current ledger"
    ).expect("metric creation failed");

    // =========================================================================
    // SCHEDULER
    // =========================================================================

    /// Current ordinal index
    pub static ref NODE_INDEX: IntGauge = IntGauge::new(
        "ad_scheduler_node_index",
        "Ordinal index of the next candidate"
    ).expect("metric creation failed");

    /// 1 while a run is active
    pub static ref RUNNING: IntGauge = IntGauge::new(
        "ad_scheduler_running",
        "Whether a discovery run is active"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Archive nodes reported
    pub static ref ARCHIVE_FOUND: IntCounter = IntCounter::new(
        "ad_archive_found_total",
        "ARCHIVE_FOUND events emitted"
    ).expect("metric creation failed");

    /// Events by type
    pub static ref EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ad_events_total", "Engine events by type"),
        &["event_type"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(NODES_TESTED.clone()),
        Box::new(NODES_ARCHIVE.clone()),
        Box::new(NODES_NON_ARCHIVE.clone()),
        Box::new(NODES_SKIPPED.clone()),
        Box::new(CYCLE_ERRORS.clone()),
        // Scheduler
        Box::new(NODE_INDEX.clone()),
        Box::new(RUNNING.clone()),
        // Events
        Box::new(ARCHIVE_FOUND.clone()),
        Box::new(EVENTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

fn as_gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn record_snapshot(snapshot: &StateSnapshot) {
    let counters = &snapshot.counters;
    NODES_TESTED.set(as_gauge(counters.tested));
    NODES_ARCHIVE.set(as_gauge(counters.archive));
    NODES_NON_ARCHIVE.set(as_gauge(counters.non_archive));
    NODES_SKIPPED.set(as_gauge(counters.skipped));
    CYCLE_ERRORS.set(as_gauge(counters.errors));
    NODE_INDEX.set(as_gauge(snapshot.index));
    RUNNING.set(i64::from(snapshot.running));
}

/// Update metrics from an engine event.
pub fn observe(event: &Event) {
    EVENTS.with_label_values(&[event.kind()]).inc();
    match event {
        Event::StateUpdate(snapshot) => record_snapshot(snapshot),
        Event::ArchiveFound(_) => ARCHIVE_FOUND.inc(),
        Event::Started => RUNNING.set(1),
        Event::Stopped => RUNNING.set(0),
        _ => {}
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
