//! # Discovery Controller
//!
//! Host-side mirror of the engine. Wraps a handle and the event stream and
//! keeps the latest view (initialized, running, snapshot, archive nodes)
//! current as events are pulled.

use std::collections::VecDeque;
use tracing::debug;

use super::channel::{DiscoveryHandle, EventReceiver};
use super::messages::{Event, InitializedPayload};
use crate::config::{ConfigPatch, DiscoveryConfig};
use crate::domain::{DiscoveryError, ProbeResult, StateSnapshot};
use crate::ports::DiscoveryApi;

/// Controller-side mirror of engine state.
pub struct DiscoveryController {
    handle: DiscoveryHandle,
    events: EventReceiver,
    backlog: VecDeque<Event>,
    is_initialized: bool,
    is_running: bool,
    snapshot: Option<StateSnapshot>,
    archive_nodes: Vec<ProbeResult>,
    config: Option<DiscoveryConfig>,
}

impl DiscoveryController {
    /// Wrap a spawned engine.
    pub fn new(handle: DiscoveryHandle, events: EventReceiver) -> Self {
        Self {
            handle,
            events,
            backlog: VecDeque::new(),
            is_initialized: false,
            is_running: false,
            snapshot: None,
            archive_nodes: Vec::new(),
            config: None,
        }
    }

    /// Send INIT then CONFIG and wait for INITIALIZED.
    ///
    /// Events received while waiting are kept and returned by later calls
    /// to [`DiscoveryController::next_event`].
    pub async fn init(&mut self, module_ref: &str, patch: ConfigPatch) -> Result<(), DiscoveryError> {
        self.handle.init(module_ref).await?;
        self.handle.update_config(patch).await?;

        loop {
            let event = self
                .events
                .recv()
                .await
                .ok_or(DiscoveryError::ChannelClosed)?;
            self.observe(&event);
            let reply = match &event {
                Event::Initialized(payload) => Some(payload.clone()),
                _ => None,
            };
            self.backlog.push_back(event);

            match reply {
                Some(InitializedPayload { success: true, .. }) => return Ok(()),
                Some(InitializedPayload { error, .. }) => {
                    return Err(DiscoveryError::Initialization(
                        error.unwrap_or_else(|| "unknown failure".into()),
                    ))
                }
                None => {}
            }
        }
    }

    /// Ask the engine to start.
    pub async fn start(&self) -> Result<(), DiscoveryError> {
        self.handle.start().await
    }

    /// Ask the engine to stop.
    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        self.handle.stop().await
    }

    /// Send a configuration patch.
    pub async fn update_config(&self, patch: ConfigPatch) -> Result<(), DiscoveryError> {
        self.handle.update_config(patch).await
    }

    /// Request a snapshot.
    pub async fn get_state(&self) -> Result<(), DiscoveryError> {
        self.handle.get_state().await
    }

    /// Clear the engine's ledger.
    pub async fn reset(&self) -> Result<(), DiscoveryError> {
        self.handle.reset().await
    }

    /// Next event, after updating the mirror. `None` once the engine is gone.
    pub async fn next_event(&mut self) -> Option<Event> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        let event = self.events.recv().await?;
        self.observe(&event);
        Some(event)
    }

    fn observe(&mut self, event: &Event) {
        match event {
            Event::Initialized(payload) => self.is_initialized |= payload.success,
            Event::Started => self.is_running = true,
            Event::Stopped => self.is_running = false,
            Event::ConfigUpdated(payload) => self.config = Some(payload.config.clone()),
            Event::StateUpdate(snapshot) => {
                self.is_running = snapshot.running;
                self.archive_nodes = snapshot.archive_records.clone();
                self.snapshot = Some(snapshot.clone());
            }
            // Dedup belongs to the ledger; mirror every record it appends.
            Event::ArchiveFound(result) => self.archive_nodes.push(result.clone()),
            Event::Log(_) | Event::Error(_) => {}
        }
        debug!(event = event.kind(), "[archive-discovery] controller observed");
    }

    /// Whether INIT succeeded.
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    /// Whether a run is active, as last reported.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        self.snapshot.as_ref()
    }

    /// Archive nodes discovered so far.
    pub fn archive_nodes(&self) -> &[ProbeResult] {
        &self.archive_nodes
    }

    /// Live configuration, as last reported.
    pub fn config(&self) -> Option<&DiscoveryConfig> {
        self.config.as_ref()
    }

    /// Underlying handle.
    pub fn handle(&self) -> &DiscoveryHandle {
        &self.handle
    }
}
