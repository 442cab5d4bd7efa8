//! # Control Channel
//!
//! Spawns the engine task and hands back the controller's side of the two
//! channels. Commands queue without bound; the engine exits once every
//! [`DiscoveryHandle`] clone has been dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::{Command, Event, InitRequest};
use crate::application::DiscoveryEngine;
use crate::config::{ConfigPatch, DiscoveryConfig, EngineSettings};
use crate::domain::DiscoveryError;
use crate::ports::{ClientModuleLoader, DiscoveryApi, TimeSource};

/// Controller's end of the event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Spawn a discovery engine on the current tokio runtime.
pub fn spawn_engine(
    loader: Arc<dyn ClientModuleLoader>,
    config: DiscoveryConfig,
    settings: EngineSettings,
    time: Arc<dyn TimeSource>,
) -> (DiscoveryHandle, EventReceiver) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let engine = DiscoveryEngine::new(config, settings, loader, time, command_rx, event_tx);
    tokio::spawn(engine.run());

    (DiscoveryHandle { commands: command_tx }, event_rx)
}

/// Cloneable command sender.
#[derive(Clone, Debug)]
pub struct DiscoveryHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl DiscoveryHandle {
    /// Enqueue a raw command.
    pub fn send(&self, command: Command) -> Result<(), DiscoveryError> {
        self.commands
            .send(command)
            .map_err(|_| DiscoveryError::ChannelClosed)
    }

    /// Whether the engine task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[async_trait]
impl DiscoveryApi for DiscoveryHandle {
    async fn init(&self, module_ref: &str) -> Result<(), DiscoveryError> {
        self.send(Command::Init(InitRequest {
            module_ref: module_ref.to_string(),
        }))
    }

    async fn start(&self) -> Result<(), DiscoveryError> {
        self.send(Command::Start)
    }

    async fn stop(&self) -> Result<(), DiscoveryError> {
        self.send(Command::Stop)
    }

    async fn update_config(&self, patch: ConfigPatch) -> Result<(), DiscoveryError> {
        self.send(Command::Config(patch))
    }

    async fn get_state(&self) -> Result<(), DiscoveryError> {
        self.send(Command::GetState)
    }

    async fn reset(&self) -> Result<(), DiscoveryError> {
        self.send(Command::Reset)
    }
}
