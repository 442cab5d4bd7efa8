//! # IPC Module
//!
//! Typed control channel between the engine task and its controller, plus
//! the JSON-lines wire codec for out-of-process hosts.

pub mod channel;
pub mod controller;
pub mod messages;
pub mod wire;

pub use channel::{spawn_engine, DiscoveryHandle, EventReceiver};
pub use controller::DiscoveryController;
pub use messages::{
    Command, ConfigUpdatedPayload, ErrorEntry, Event, InitRequest, InitializedPayload, LogEntry,
    LogLevel, COMMAND_TYPES,
};
pub use wire::{decode_command, decode_event, encode_command, encode_event};
