//! Chat message types exchanged with the bridge.

use serde::{Deserialize, Serialize};

/// Incoming text message from a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IncomingMessage {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: String::new(),
            text: text.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Outgoing text message to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub text: String,
}

impl OutgoingMessage {
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
        }
    }
}
