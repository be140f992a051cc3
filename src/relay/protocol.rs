//! Chat wire protocol
//!
//! Every frame exchanged over a relay connection is a single JSON object:
//!
//! ```json
//! { "type": "message", "from": "...", "to": "<uuid>", "content": "hi", "timestamp": 1700000000000 }
//! ```
//!
//! `type` and `timestamp` are required; everything else is optional and is
//! omitted on output when absent. Unknown fields are ignored.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use uuid::{fmt::Hyphenated, Uuid};

use crate::error::{RelayError, Result};

/// Originator name used for frames the relay itself produces
pub const SERVER_SENDER: &str = "server";

/// Content of the error frame echoed back for malformed input
pub const INVALID_FORMAT: &str = "Invalid message format";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Message,
    Join,
    Leave,
    Ping,
    Pong,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::Join => "join",
            MessageType::Leave => "leave",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_recipient",
        skip_serializing_if = "Option::is_none"
    )]
    pub to: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub timestamp: i64,
}

impl Message {
    fn from_server(kind: MessageType, content: Option<String>) -> Self {
        Self {
            kind,
            from: Some(SERVER_SENDER.to_string()),
            to: None,
            content,
            timestamp: now_millis(),
        }
    }

    /// Join acknowledgment carrying the id assigned to a new connection
    pub fn joined(id: Uuid) -> Self {
        Self::from_server(MessageType::Join, Some(format!("Connected with ID: {}", id)))
    }

    pub fn pong() -> Self {
        Self::from_server(MessageType::Pong, None)
    }

    /// Error frame sent to a connection whose last frame failed to parse
    pub fn invalid_format() -> Self {
        Self::from_server(MessageType::Message, Some(INVALID_FORMAT.to_string()))
    }

    /// Copy of this message ready for relay: `from` is the sender's actual id
    /// and `timestamp` is the relay time. Client-supplied values are dropped.
    pub fn relayed(&self, sender: Uuid) -> Self {
        Self {
            from: Some(sender.to_string()),
            timestamp: now_millis(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp <= 0 {
            return Err(RelayError::ProtocolViolation(format!(
                "timestamp must be a positive integer, got {}",
                self.timestamp
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

/// `to` may be absent, but when present it must be a canonical hyphenated
/// UUID string. `null`, simple, braced and URN forms are rejected.
fn deserialize_recipient<'de, D>(deserializer: D) -> std::result::Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.len() != Hyphenated::LENGTH {
        return Err(D::Error::custom(format!(
            "recipient must be a hyphenated UUID, got {:?}",
            raw
        )));
    }
    Uuid::parse_str(&raw).map(Some).map_err(D::Error::custom)
}

/// Decode and validate one inbound text frame.
pub fn parse_frame(text: &str) -> Result<Message> {
    let message: Message = serde_json::from_str(text)
        .map_err(|e| RelayError::ProtocolViolation(e.to_string()))?;
    message.validate()?;
    Ok(message)
}

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
