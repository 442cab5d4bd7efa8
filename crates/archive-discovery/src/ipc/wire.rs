//! JSON wire codec for commands and events.

use serde_json::Value;

use super::messages::{Command, Event, COMMAND_TYPES};
use crate::domain::DiscoveryError;

/// Encode an event as one JSON line.
pub fn encode_event(event: &Event) -> Result<String, DiscoveryError> {
    serde_json::to_string(event).map_err(|e| DiscoveryError::Codec(e.to_string()))
}

/// Decode an event.
pub fn decode_event(input: &str) -> Result<Event, DiscoveryError> {
    serde_json::from_str(input).map_err(|e| DiscoveryError::Codec(e.to_string()))
}

/// Encode a command as one JSON line.
pub fn encode_command(command: &Command) -> Result<String, DiscoveryError> {
    serde_json::to_string(command).map_err(|e| DiscoveryError::Codec(e.to_string()))
}

/// Decode a command.
///
/// An unrecognized `type` yields [`DiscoveryError::UnknownCommand`]; any
/// other malformation is a [`DiscoveryError::Codec`].
pub fn decode_command(input: &str) -> Result<Command, DiscoveryError> {
    let mut value: Value =
        serde_json::from_str(input).map_err(|e| DiscoveryError::Codec(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DiscoveryError::Codec("missing command type".into()))?
        .to_string();
    if !COMMAND_TYPES.contains(&kind.as_str()) {
        return Err(DiscoveryError::UnknownCommand(kind));
    }

    // Payload-less commands tolerate an explicit null or absent data.
    if let Some(object) = value.as_object_mut() {
        if object.get("data").is_some_and(Value::is_null) {
            object.remove("data");
        }
    }
    // INIT may carry the module ref as a bare string.
    if kind == "INIT" {
        let bare = value.get("data").and_then(Value::as_str).map(str::to_string);
        if let Some(module_ref) = bare {
            value["data"] = serde_json::json!({ "moduleRef": module_ref });
        }
    }
    if matches!(kind.as_str(), "INIT" | "CONFIG") && value.get("data").is_none() {
        value["data"] = Value::Object(Default::default());
    }

    serde_json::from_value(value).map_err(|e| DiscoveryError::Codec(e.to_string()))
}
