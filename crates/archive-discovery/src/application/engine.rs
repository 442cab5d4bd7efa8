//! # Discovery Engine
//!
//! The single task that owns configuration, ledger and scheduler, and runs
//! the probe-classify-record cycle.
//!
//! ## Command handling
//!
//! Commands are read only between cycles: while idle, or while waiting for
//! the next cycle deadline. A probe in flight always completes before a
//! STOP, CONFIG or GET_STATE is observed.
//!
//! Before a successful INIT, every command except INIT and CONFIG is held
//! back and replayed in submission order once the client module is loaded.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use super::classifier::ArchiveClassifier;
use super::emitter::EventEmitter;
use super::probe::ProbeExecutor;
use super::scheduler::DiscoveryScheduler;
use crate::config::{ConfigPatch, DiscoveryConfig, EngineSettings};
use crate::domain::{DiscoveryError, Ledger, NodeIdentity, ProbeResult};
use crate::ipc::{
    Command, ConfigUpdatedPayload, Event, InitRequest, InitializedPayload, LogLevel,
};
use crate::ports::{ClientModuleLoader, TimeSource};

/// What one cycle did.
#[derive(Debug)]
enum CycleOutcome {
    /// Directory had nothing at this index.
    Exhausted,
    /// Candidate already tested.
    Skipped(NodeIdentity),
    /// Candidate probed and classified.
    Classified(ProbeResult),
}

/// Discovery engine task state.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    settings: EngineSettings,
    ledger: Ledger,
    scheduler: DiscoveryScheduler,
    loader: Arc<dyn ClientModuleLoader>,
    executor: Option<ProbeExecutor>,
    pending: VecDeque<Command>,
    commands: mpsc::UnboundedReceiver<Command>,
    emitter: EventEmitter,
    run_span: Span,
}

impl DiscoveryEngine {
    /// Create an engine reading `commands` and writing `events`.
    pub fn new(
        config: DiscoveryConfig,
        settings: EngineSettings,
        loader: Arc<dyn ClientModuleLoader>,
        time: Arc<dyn TimeSource>,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let ledger = Ledger::new(settings.recent_heights_capacity);
        Self {
            config,
            settings,
            ledger,
            scheduler: DiscoveryScheduler::new(),
            loader,
            executor: None,
            pending: VecDeque::new(),
            commands,
            emitter: EventEmitter::new(events, time),
            run_span: Span::none(),
        }
    }

    /// Whether the client module is loaded.
    pub fn is_initialized(&self) -> bool {
        self.executor.is_some()
    }

    /// Run until every command sender is dropped.
    pub async fn run(mut self) {
        info!("[archive-discovery] engine started");

        loop {
            let deadline = self
                .scheduler
                .next_cycle_at()
                .filter(|_| self.scheduler.is_running());

            let command = match deadline {
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        command = self.commands.recv() => match command {
                            Some(command) => Some(command),
                            None => break,
                        },
                        _ = sleep_until(deadline) => None,
                    }
                }
                None => match self.commands.recv().await {
                    Some(command) => Some(command),
                    None => break,
                },
            };

            match command {
                Some(command) => self.dispatch(command).await,
                None => self.run_cycle().await,
            }
        }

        info!("[archive-discovery] control channel closed, engine exiting");
    }

    async fn dispatch(&mut self, command: Command) {
        debug!(command = command.kind(), "[archive-discovery] command received");
        match command {
            Command::Init(request) if !self.is_initialized() => self.initialize(request).await,
            Command::Config(patch) => self.update_config(patch),
            command if !self.is_initialized() => {
                debug!(
                    command = command.kind(),
                    pending = self.pending.len() + 1,
                    "[archive-discovery] not initialized, buffering"
                );
                self.pending.push_back(command);
            }
            command => self.apply(command),
        }
    }

    /// Handle a command that needs no I/O. Requires initialization.
    fn apply(&mut self, command: Command) {
        match command {
            Command::Init(_) => {
                self.emitter.emit(Event::Initialized(InitializedPayload {
                    success: true,
                    error: None,
                }));
            }
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Config(patch) => self.update_config(patch),
            Command::GetState => self.emit_state(),
            Command::Reset => self.reset(),
        }
    }

    async fn initialize(&mut self, request: InitRequest) {
        match self.loader.load(&request.module_ref).await {
            Ok(capabilities) => {
                self.executor = Some(ProbeExecutor::new(
                    capabilities,
                    self.settings.connect_timeout,
                ));
                self.emitter.emit(Event::Initialized(InitializedPayload {
                    success: true,
                    error: None,
                }));
                self.emitter.log(LogLevel::Success, "Client module loaded");

                while let Some(command) = self.pending.pop_front() {
                    self.apply(command);
                }
            }
            Err(e) => {
                self.emitter
                    .error("Failed to initialize client module", Some(e.to_string()));
                self.emitter.emit(Event::Initialized(InitializedPayload {
                    success: false,
                    error: Some(e.to_string()),
                }));
            }
        }
    }

    fn start(&mut self) {
        if !self.scheduler.start(Instant::now()) {
            self.emitter.log(LogLevel::Warning, "Discovery already running");
            return;
        }

        let run_id = Uuid::new_v4();
        self.run_span = info_span!("discovery_run", %run_id);
        self.run_span.in_scope(|| {
            info!(
                max_nodes = self.config.max_nodes,
                source = %self.config.node_source_url,
                "[archive-discovery] run started"
            )
        });

        self.emitter.emit(Event::Started);
        self.emitter.log(
            LogLevel::Info,
            format!(
                "Starting archive discovery (budget {} nodes)",
                self.config.max_nodes
            ),
        );
    }

    fn stop(&mut self) {
        if !self.scheduler.request_stop() {
            debug!("[archive-discovery] stop ignored, not running");
            return;
        }
        self.finish_run("Discovery stopped");
    }

    fn finish_run(&mut self, message: &str) {
        self.scheduler.finish_stop();
        self.emitter.log(LogLevel::Info, message);
        self.emitter.emit(Event::Stopped);
        self.emit_state();
        self.run_span = Span::none();
    }

    fn update_config(&mut self, patch: ConfigPatch) {
        match self.config.apply(&patch) {
            Ok(()) => {
                debug!(config = ?self.config, "[archive-discovery] config updated");
                self.emitter.emit(Event::ConfigUpdated(ConfigUpdatedPayload {
                    config: self.config.clone(),
                }));
            }
            Err(e) => self
                .emitter
                .error("Configuration rejected", Some(e.to_string())),
        }
    }

    fn reset(&mut self) {
        if self.scheduler.is_running() {
            let e = DiscoveryError::InvalidState("RESET while running".into());
            self.emitter.error("Cannot reset a running discovery", Some(e.to_string()));
            return;
        }
        self.ledger.reset();
        self.emitter.log(LogLevel::Info, "Ledger reset");
        self.emit_state();
    }

    fn emit_state(&self) {
        self.emitter.emit(Event::StateUpdate(
            self.ledger
                .snapshot(self.scheduler.is_running(), self.scheduler.index()),
        ));
    }

    async fn run_cycle(&mut self) {
        let span = self.run_span.clone();
        self.run_cycle_inner().instrument(span).await
    }

    async fn run_cycle_inner(&mut self) {
        // Cycle works on a snapshot of the config.
        let config = self.config.clone();

        if self.scheduler.budget_exhausted(config.max_nodes) {
            self.exhaust_budget(config.max_nodes);
            return;
        }

        let index = self.scheduler.index();
        let pause = match self.cycle(&config, index).await {
            Ok(CycleOutcome::Exhausted) => {
                debug!(index, "[archive-discovery] node source exhausted");
                config.probe_interval()
            }
            Ok(CycleOutcome::Skipped(identity)) => {
                self.ledger.record_skip();
                self.scheduler.advance();
                self.emitter
                    .log(LogLevel::Debug, format!("Skipping already tested node {identity}"));
                config.probe_interval()
            }
            Ok(CycleOutcome::Classified(result)) => {
                self.scheduler.advance();
                self.record(result);
                config.probe_interval()
            }
            Err(e) => {
                self.ledger.record_error();
                self.scheduler.advance();
                self.emitter
                    .log(LogLevel::Error, format!("Node {index} failed: {e}"));
                // Flat, and never shorter than the healthy pacing.
                self.settings.error_backoff.max(config.probe_interval())
            }
        };

        if self.scheduler.budget_exhausted(config.max_nodes) {
            self.exhaust_budget(config.max_nodes);
            return;
        }
        self.scheduler.schedule_after(Instant::now(), pause);
    }

    async fn cycle(
        &mut self,
        config: &DiscoveryConfig,
        index: u64,
    ) -> Result<CycleOutcome, DiscoveryError> {
        let executor = self
            .executor
            .as_mut()
            .ok_or_else(|| DiscoveryError::InvalidState("not initialized".into()))?;

        let Some(endpoint) = executor.resolve(&config.node_source_url, index).await? else {
            return Ok(CycleOutcome::Exhausted);
        };

        let identity = endpoint.identity();
        if self.ledger.should_skip(&identity, config.skip_duplicate_check) {
            return Ok(CycleOutcome::Skipped(identity));
        }

        self.emitter
            .log(LogLevel::Debug, format!("Testing node {index}: {}", endpoint.url));

        let classifier = ArchiveClassifier::from_config(config);
        let recent_heights = self.ledger.recent_archive_heights();
        let result = executor
            .probe(&endpoint, index, &classifier, &recent_heights)
            .await?;
        Ok(CycleOutcome::Classified(result))
    }

    fn record(&mut self, result: ProbeResult) {
        if result.classified_archive {
            self.emitter.log(
                LogLevel::Archive,
                format!(
                    "Archive node found: {} at height {} ({})",
                    result.identity, result.block_height, result.server_label
                ),
            );
            self.emitter.emit(Event::ArchiveFound(result.clone()));
        } else {
            let detail = result
                .historical_outcome
                .reason
                .as_deref()
                .map(|reason| format!(", {reason}"))
                .unwrap_or_default();
            self.emitter.log(
                LogLevel::Info,
                format!(
                    "Non-archive node {} at height {}{}",
                    result.identity, result.block_height, detail
                ),
            );
        }

        self.ledger.record_result(result);

        let tested = self.ledger.counters().tested;
        if self.settings.snapshot_interval > 0 && tested % self.settings.snapshot_interval == 0 {
            self.emit_state();
        }
    }

    fn exhaust_budget(&mut self, max_nodes: u64) {
        info!(max_nodes, "[archive-discovery] node budget exhausted");
        self.finish_run(&format!(
            "Node budget exhausted after {max_nodes} nodes, stopping"
        ));
    }
}
