//! Wire frames sent to the sink endpoint.

use serde::Serialize;
use thingmodel_schema::Thing;

/// Outgoing WebSocket frames, serialised as JSON text with a `type` tag.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame<'a> {
    /// A thing was registered by the named sender.
    ThingRegistered { sender: &'a str, thing: &'a Thing },
}

impl<'a> OutgoingFrame<'a> {
    pub fn thing_registered(sender: &'a str, thing: &'a Thing) -> Self {
        Self::ThingRegistered { sender, thing }
    }

    /// Encodes the frame as a JSON string.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
