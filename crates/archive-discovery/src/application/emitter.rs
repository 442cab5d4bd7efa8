//! Event emission with tracing mirror.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ipc::{ErrorEntry, Event, LogEntry, LogLevel};
use crate::ports::TimeSource;

/// Sends events to the controller and mirrors LOG/ERROR to `tracing`.
///
/// A dropped receiver is not an error: the engine keeps running until its
/// command senders are gone.
#[derive(Clone)]
pub struct EventEmitter {
    events: mpsc::UnboundedSender<Event>,
    time: Arc<dyn TimeSource>,
}

impl EventEmitter {
    /// Emitter over `events`, stamping with `time`.
    pub fn new(events: mpsc::UnboundedSender<Event>, time: Arc<dyn TimeSource>) -> Self {
        Self { events, time }
    }

    /// Current timestamp in Unix milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.time.now_millis()
    }

    /// Send an event as-is.
    pub fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("[archive-discovery] event receiver dropped");
        }
    }

    /// Emit a LOG event.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!(target: "archive_discovery::log", "{message}"),
            LogLevel::Info | LogLevel::Success => info!(target: "archive_discovery::log", "{message}"),
            LogLevel::Archive => info!(target: "archive_discovery::log", archive = true, "{message}"),
            LogLevel::Warning => warn!(target: "archive_discovery::log", "{message}"),
            LogLevel::Error => error!(target: "archive_discovery::log", "{message}"),
        }
        self.emit(Event::Log(LogEntry {
            message,
            level,
            timestamp: self.now_millis(),
        }));
    }

    /// Emit an ERROR event.
    pub fn error(&self, message: impl Into<String>, cause: Option<String>) {
        let message = message.into();
        error!(
            target: "archive_discovery::log",
            cause = cause.as_deref().unwrap_or(""),
            "{message}"
        );
        self.emit(Event::Error(ErrorEntry {
            message,
            error: cause,
            timestamp: self.now_millis(),
        }));
    }
}
