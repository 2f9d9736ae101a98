//! Relay wire protocol.
//!
//! Every frame is a JSON text message tagged by `type`. Game state travels
//! as an opaque JSON value; the relay never looks inside it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Create-or-join a room.
    Join {
        room: String,
        password: String,
        #[serde(default)]
        name: String,
    },
    /// Replace the room's authoritative state.
    Update { state: Value },
}

/// Message sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Join accepted; `state` is `null` until someone pushes an update.
    Joined { state: Value },
    /// Join rejected or send failed.
    Error { message: String },
    /// New authoritative state.
    State { state: Value },
    /// Room membership changed.
    Players { count: usize },
}

impl ClientMessage {
    /// Parse a text frame. Anything unparseable is `None` and gets dropped.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_wire_format() {
        let msg = ClientMessage::Join {
            room: "r1".into(),
            password: "p".into(),
            name: "Ada".into(),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value, json!({"type": "join", "room": "r1", "password": "p", "name": "Ada"}));
    }

    #[test]
    fn test_join_without_name() {
        let msg = ClientMessage::parse(r#"{"type":"join","room":"r1","password":"p"}"#).unwrap();

        assert!(matches!(msg, ClientMessage::Join { name, .. } if name.is_empty()));
    }

    #[test]
    fn test_server_messages_parse() {
        assert_eq!(
            ServerMessage::parse(r#"{"type":"joined","state":null}"#),
            Some(ServerMessage::Joined { state: Value::Null })
        );
        assert_eq!(
            ServerMessage::parse(r#"{"type":"players","count":2}"#),
            Some(ServerMessage::Players { count: 2 })
        );
        assert_eq!(
            ServerMessage::Error { message: "Wrong password".into() }.to_json().unwrap(),
            r#"{"type":"error","message":"Wrong password"}"#
        );
    }

    #[test]
    fn test_malformed_is_dropped() {
        assert_eq!(ClientMessage::parse("not json"), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"dance"}"#), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"update"}"#), None);
    }
}
