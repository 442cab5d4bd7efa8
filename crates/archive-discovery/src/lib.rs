//! # Archive Discovery
//!
//! Continuous discovery of archive nodes on a public blockchain network.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Walk the directory service candidate by candidate, connect to each node,
//! and decide whether it retains full history:
//! - Block-height threshold as a cheap first filter
//! - Fixed-depth probe one day of blocks below the tip
//! - Adaptive probe at half the median height of confirmed archive nodes
//!
//! The engine runs as one isolated tokio task driven by typed commands and
//! reporting through typed events.
//!
//! ## Engine Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | Balanced counters | `tested == archive + nonArchive` after every cycle |
//! | No retests | Endpoint-derived identity checked before connecting |
//! | Failure containment | A failing node costs one backoff, never the run |
//! | Session hygiene | Every client session is closed on every path |
//! | Bounded runs | Automatic stop once `maxNodes` indices were consumed |
//!
//! ## Module Structure
//!
//! ```text
//! archive-discovery/
//! ├── domain/          # Entities, counters, ledger, errors, invariants
//! ├── algorithms/      # Median and historical probe planning
//! ├── ports/           # DiscoveryApi (inbound) + capabilities (outbound)
//! ├── application/     # Engine task, scheduler, probe executor, classifier
//! ├── ipc/             # Command/Event channel, controller mirror, JSON codec
//! ├── adapters/        # System clock; HTTP directory + JSON-RPC (feature "http")
//! ├── testing.rs       # Scripted mocks (feature "test-utils")
//! └── config.rs        # DiscoveryConfig, ConfigPatch, EngineSettings
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use archive_discovery::{
//!     spawn_engine, DiscoveryApi, DiscoveryConfig, EngineSettings, SystemTimeSource,
//!     ClientModuleLoader,
//! };
//!
//! async fn run(loader: Arc<dyn ClientModuleLoader>) {
//!     let (handle, mut events) = spawn_engine(
//!         loader,
//!         DiscoveryConfig::default(),
//!         EngineSettings::default(),
//!         Arc::new(SystemTimeSource),
//!     );
//!     handle.init("mainnet").await.ok();
//!     handle.start().await.ok();
//!     while let Some(event) = events.recv().await {
//!         println!("{}", event.kind());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use adapters::SystemTimeSource;
pub use algorithms::{median_depth, median_height, plan_historical_probes, HistoricalProbe, HistoricalProbeKind};
pub use application::{ArchiveClassifier, DiscoveryEngine, DiscoveryScheduler, ProbeExecutor};
pub use config::{ConfigPatch, DiscoveryConfig, EngineSettings};
pub use domain::{
    BlockSummary, Counters, DiscoveryError, HistoricalOutcome, Ledger, NodeEndpoint,
    NodeIdentity, ProbeResult, RunState, ServerInfo, StateSnapshot, FIXED_PROBE_DEPTH,
};
pub use ipc::{
    decode_command, decode_event, encode_command, encode_event, spawn_engine, Command,
    DiscoveryController, DiscoveryHandle, Event, EventReceiver, LogLevel,
};
pub use ports::{
    ChainClient, ChainClientFactory, ClientCapabilities, ClientModuleLoader, DiscoveryApi,
    NodeSource, NodeSourceFactory, TimeSource,
};

#[cfg(feature = "http")]
pub use adapters::HttpClientModule;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
