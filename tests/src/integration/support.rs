//! Session fixture: a spawned engine plus the mocks behind it.

use std::sync::Arc;
use std::time::Duration;

use archive_discovery::testing::{
    FixedTimeSource, MockChainClient, MockClientModule, MockNodeSource,
};
use archive_discovery::{
    spawn_engine, ConfigPatch, DiscoveryConfig, DiscoveryController, EngineSettings, Event,
    LogLevel, StateSnapshot,
};

/// Longest a test waits for one event. Runs are on a paused clock, so this
/// only trips when the engine has gone idle.
const EVENT_WAIT: Duration = Duration::from_secs(600);

pub struct Session {
    pub controller: DiscoveryController,
    pub directory: MockNodeSource,
    pub clients: MockChainClient,
    pub module: MockClientModule,
    pub seen: Vec<Event>,
}

impl Session {
    pub fn spawn(directory: MockNodeSource, clients: MockChainClient) -> Self {
        let module = MockClientModule::new(directory.clone(), clients.clone());
        let (handle, events) = spawn_engine(
            Arc::new(module.clone()),
            DiscoveryConfig::for_testing(),
            EngineSettings::for_testing(),
            Arc::new(FixedTimeSource::new(1_700_000_000_000)),
        );
        Self {
            controller: DiscoveryController::new(handle, events),
            directory,
            clients,
            module,
            seen: Vec::new(),
        }
    }

    /// INIT with a node budget, panicking on failure.
    pub async fn init_with_budget(&mut self, max_nodes: u64) {
        self.controller
            .init(
                "mock",
                ConfigPatch {
                    max_nodes: Some(max_nodes),
                    ..Default::default()
                },
            )
            .await
            .expect("init failed");
    }

    pub async fn next(&mut self) -> Event {
        let event = tokio::time::timeout(EVENT_WAIT, self.controller.next_event())
            .await
            .expect("engine went idle")
            .expect("engine exited");
        self.seen.push(event.clone());
        event
    }

    /// Read events up to and including the first of `kind`.
    pub async fn until(&mut self, kind: &str) -> Event {
        loop {
            let event = self.next().await;
            if event.kind() == kind {
                return event;
            }
        }
    }

    /// Follow a run to STOPPED and return the snapshot that follows it.
    pub async fn run_to_stop(&mut self) -> StateSnapshot {
        self.until("STOPPED").await;
        self.snapshot_event().await
    }

    pub async fn snapshot_event(&mut self) -> StateSnapshot {
        match self.until("STATE_UPDATE").await {
            Event::StateUpdate(snapshot) => snapshot,
            other => unreachable!("until returned {other:?}"),
        }
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.seen.iter().map(Event::kind).collect()
    }

    /// Messages of LOG events at `level`.
    pub fn logs(&self, level: LogLevel) -> Vec<String> {
        self.seen
            .iter()
            .filter_map(|event| match event {
                Event::Log(entry) if entry.level == level => Some(entry.message.clone()),
                _ => None,
            })
            .collect()
    }

    /// ERROR events as (message, cause).
    pub fn errors(&self) -> Vec<(String, Option<String>)> {
        self.seen
            .iter()
            .filter_map(|event| match event {
                Event::Error(entry) => Some((entry.message.clone(), entry.error.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Directory listing `wss://node-{i}.example` for `0..count`.
pub fn numbered_urls(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("wss://node-{i}.example")).collect()
}
