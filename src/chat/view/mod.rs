//! Read-only views handed to a presentation layer.

pub mod recency;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chat::core::conversation::Conversation;
use crate::chat::core::ids::ConversationId;
use crate::chat::engine::store::ConversationStore;

pub use recency::{RecencyGroup, group_by_recency};

/// Everything a chat screen renders, detached from the store lock.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    /// All conversations, newest-created first.
    pub conversations: Vec<Conversation>,
    /// The selected conversation, if the selection resolves.
    pub current_conversation: Option<Conversation>,
    /// Whether a reply is outstanding.
    pub is_loading: bool,
    /// Last storage or reply failure.
    pub error: Option<String>,
}

impl ChatSnapshot {
    /// Copy the observable state out of a store.
    #[must_use]
    pub fn from_store(store: &ConversationStore) -> Self {
        Self {
            conversations: store.conversations().to_vec(),
            current_conversation: store.current_conversation().cloned(),
            is_loading: store.is_loading(),
            error: store.error().map(ToString::to_string),
        }
    }

    /// Sidebar rows for every conversation, in list order.
    #[must_use]
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.conversations.iter().map(ConversationSummary::from).collect()
    }
}

/// One sidebar row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Last activity.
    pub updated_at: DateTime<Utc>,
    /// Number of messages.
    pub message_count: usize,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            updated_at: conversation.updated_at,
            message_count: conversation.messages.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chat::core::config::TitleConfig;
    use crate::chat::storage::blob_store::MemoryBlobStore;

    #[test]
    fn test_snapshot_mirrors_store() {
        let mut store = ConversationStore::open(
            Arc::new(MemoryBlobStore::new()),
            "k",
            TitleConfig::default(),
        );
        let _ = store.create();
        let _ = store.submit("what is a lifetime");

        let snapshot = ChatSnapshot::from_store(&store);
        assert_eq!(snapshot.conversations.len(), 1);
        assert!(snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert_eq!(
            snapshot.current_conversation.as_ref().map(|c| c.id),
            store.current_conversation_id()
        );

        let rows = snapshot.summaries();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "what is a lifetime");
        assert_eq!(rows[0].message_count, 1);
    }

    #[test]
    fn test_snapshot_with_stale_selection() {
        let mut store = ConversationStore::open(
            Arc::new(MemoryBlobStore::new()),
            "k",
            TitleConfig::default(),
        );
        let _ = store.create();
        store.select(ConversationId::new());
        let snapshot = ChatSnapshot::from_store(&store);
        assert!(snapshot.current_conversation.is_none());
        assert_eq!(snapshot.conversations.len(), 1);
    }
}
