//! Conversation model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::ConversationId;
use crate::chat::core::message::{Message, Role};
use crate::chat::core::time::{self, iso_millis};

/// An ordered, titled thread of messages.
///
/// Serialized field names match the persisted blob (`createdAt`, `updatedAt`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Messages in append order.
    pub messages: Vec<Message>,
    /// Creation time.
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    /// Time of the last append (or creation).
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation stamped now.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = time::now();
        Self {
            id: ConversationId::new(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message at the end of the thread and refresh `updated_at`.
    pub fn append(&mut self, message: Message) {
        self.updated_at = message.timestamp;
        self.messages.push(message);
    }

    /// Whether no message has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages written by `role`.
    #[must_use]
    pub fn count_by_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new("New Chat");
        assert!(conversation.is_empty());
        assert_eq!(conversation.title, "New Chat");
        assert_eq!(conversation.created_at, conversation.updated_at);
        assert!(conversation.last_message().is_none());
    }

    #[test]
    fn test_append_preserves_order_and_touches_updated_at() {
        let mut conversation = Conversation::new("New Chat");
        let first = Message::user("first");
        let second = Message::assistant("second");
        let third = Message::user("third");
        let third_ts = third.timestamp;

        conversation.append(first.clone());
        conversation.append(second.clone());
        conversation.append(third.clone());

        assert_eq!(conversation.messages, vec![first, second, third]);
        assert_eq!(conversation.updated_at, third_ts);
        assert_eq!(conversation.count_by_role(Role::User), 2);
        assert_eq!(conversation.count_by_role(Role::Assistant), 1);
    }

    #[test]
    fn test_wire_field_names() {
        let conversation = Conversation::new("New Chat");
        let value = serde_json::to_value(&conversation).expect("serializes");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
        assert_eq!(value["messages"], serde_json::json!([]));
    }
}
