//! # Application Layer
//!
//! The engine task and the components it drives each cycle.

pub mod classifier;
pub mod emitter;
pub mod engine;
pub mod probe;
pub mod scheduler;

pub use classifier::ArchiveClassifier;
pub use emitter::EventEmitter;
pub use engine::DiscoveryEngine;
pub use probe::ProbeExecutor;
pub use scheduler::DiscoveryScheduler;
