//! Chat message model and the inbound request envelope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Regular text message from a user.
    Text,
    /// System-originated message.
    System,
    /// Assistant-generated message.
    Gpt,
    /// User joined notification.
    Join,
    /// User left notification.
    Leave,
    /// Error surfaced to the room.
    Error,
}

impl MessageKind {
    /// Get the wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::System => "system",
            MessageKind::Gpt => "gpt",
            MessageKind::Join => "join",
            MessageKind::Leave => "leave",
            MessageKind::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat message.
///
/// Messages are immutable once constructed. Every field, including `metadata`,
/// is finalized by the constructor before the message is shared with any other
/// task; rooms hold and broadcast them as `Arc<Message>`.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Unique message ID.
    pub id: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Message content.
    pub content: String,
    /// Sender's display name.
    pub sender: String,
    /// Room the message belongs to.
    pub room_id: String,
    /// Timestamp when the message was accepted.
    pub timestamp: DateTime<Utc>,
    /// Open key-value metadata. Present on the wire only when non-empty.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    /// Create a new message.
    pub fn new(
        kind: MessageKind,
        content: impl Into<String>,
        sender: impl Into<String>,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            content: content.into(),
            sender: sender.into(),
            room_id: room_id.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Create a join notification for `name`.
    pub fn join(name: &str, room_id: impl Into<String>) -> Self {
        Self::new(
            MessageKind::Join,
            format!("{name} joined the room"),
            name,
            room_id,
        )
    }

    /// Create a leave notification for `name`.
    pub fn leave(name: &str, room_id: impl Into<String>) -> Self {
        Self::new(
            MessageKind::Leave,
            format!("{name} left the room"),
            name,
            room_id,
        )
    }

    /// Create an assistant-generated message.
    ///
    /// The assistant-origin flag is part of the constructed value; metadata is
    /// never mutated after the message becomes visible to a broadcast.
    pub fn assistant(content: impl Into<String>, room_id: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("is_ai".to_string(), serde_json::Value::Bool(true));
        Self {
            id: Uuid::new_v4().to_string(),
            kind: MessageKind::Gpt,
            content: content.into(),
            sender: "GPT Assistant".to_string(),
            room_id: room_id.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// True if the message carries the assistant-origin flag.
    pub fn is_assistant(&self) -> bool {
        matches!(
            self.metadata.get("is_ai"),
            Some(serde_json::Value::Bool(true))
        )
    }
}

/// Inbound request envelope, one per client-originated unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Request kind: "message", "gpt_request", or other (ignored).
    #[serde(rename = "type")]
    pub kind: String,
    /// Message content.
    pub content: String,
    /// Target room ID.
    #[serde(default)]
    pub room_id: String,
    /// Sender's display name.
    #[serde(default)]
    pub sender: String,
}
