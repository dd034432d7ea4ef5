use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as handed over by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Instant the message was received.
    pub at: DateTime<Utc>,
    /// Message identifier assigned by the chat service.
    pub id: String,
    /// Identifier of the sending user.
    pub sender: String,
    /// Display text.
    pub text: String,
}

impl Message {
    /// Build a message from its parts.
    #[must_use]
    pub fn new(
        at: DateTime<Utc>,
        id: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            at,
            id: id.into(),
            sender: sender.into(),
            text: text.into(),
        }
    }
}
