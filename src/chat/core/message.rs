//! Message model for conversation threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chat::core::ids::MessageId;
use crate::chat::core::time::{self, iso_millis};

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the person using the chat.
    User,
    /// Generated reply.
    Assistant,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable turn in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Creation time.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a user message stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Build an assistant message stamped now.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: time::now(),
        }
    }
}
