//! Conversation state container with persist-on-change.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chat::core::config::{ReplyPolicy, TitleConfig};
use crate::chat::core::conversation::Conversation;
use crate::chat::core::ids::ConversationId;
use crate::chat::core::message::Message;
use crate::chat::core::title::derive_title;
use crate::chat::storage::blob_store::BlobStore;
use crate::chat::storage::snapshot;

/// A reply owed to a conversation after a user message was recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReply {
    /// Conversation the reply must be appended to.
    pub conversation_id: ConversationId,
    /// Ticket identifying this reply among others for the same conversation.
    pub ticket: u64,
    /// Conversation messages up to and including the user message.
    pub history: Vec<Message>,
}

/// What happened to a reply handed back to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The reply was appended.
    Appended,
    /// A newer message replaced this reply; it was discarded.
    Superseded,
    /// The conversation no longer exists; the reply was discarded.
    Orphaned,
}

/// Holds every conversation, the active pointer and the loading/error flags.
///
/// All mutations are synchronous and each one persists the full list before
/// returning.
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
    pending: HashMap<ConversationId, Vec<u64>>,
    next_ticket: u64,
    error: Option<String>,
    blob: Arc<dyn BlobStore>,
    key: String,
    title: TitleConfig,
}

impl ConversationStore {
    /// Restore the store from `blob` under `key`.
    ///
    /// A missing or malformed blob yields an empty store; nothing is raised.
    #[must_use]
    pub fn open(blob: Arc<dyn BlobStore>, key: impl Into<String>, title: TitleConfig) -> Self {
        let key = key.into();
        let conversations = snapshot::restore(blob.as_ref(), &key);
        info!(key = %key, conversations = conversations.len(), "Conversation store ready");
        Self {
            conversations,
            current: None,
            pending: HashMap::new(),
            next_ticket: 0,
            error: None,
            blob,
            key,
            title,
        }
    }

    /// All conversations, newest-created first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// The selected id, which may be stale after a `select` of an unknown id.
    #[must_use]
    pub const fn current_conversation_id(&self) -> Option<ConversationId> {
        self.current
    }

    /// The selected conversation, if the pointer resolves.
    #[must_use]
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.get(id))
    }

    /// Whether at least one reply is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Last storage or reply failure, cleared by the next successful write.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Create an empty conversation, put it first and select it.
    pub fn create(&mut self) -> ConversationId {
        let conversation = Conversation::new(self.title.placeholder.clone());
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.current = Some(id);
        info!(%id, total = self.conversations.len(), "Created conversation");
        self.persist();
        id
    }

    /// Point the selection at `id` without checking that it exists.
    pub fn select(&mut self, id: ConversationId) {
        if self.get(id).is_none() {
            debug!(%id, "Selected unknown conversation");
        }
        self.current = Some(id);
    }

    /// Remove the conversation with `id`.
    ///
    /// When it was selected, the selection moves to the first remaining
    /// conversation or is cleared. Returns whether anything was removed.
    pub fn delete(&mut self, id: ConversationId) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            debug!(%id, "Delete ignored: unknown conversation");
            return false;
        }

        self.pending.remove(&id);
        if self.current == Some(id) {
            self.current = self.conversations.first().map(|c| c.id);
        }
        info!(%id, current = ?self.current, "Deleted conversation");
        self.persist();
        true
    }

    /// Record a user message and return the reply it is owed.
    ///
    /// Blank input is ignored and returns `None`. Without a resolvable
    /// selection a new conversation is created first. The first message of a
    /// conversation sets its title.
    pub fn submit(&mut self, content: &str) -> Option<PendingReply> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let current = self.current_conversation().map(|c| c.id);
        let id = current.unwrap_or_else(|| self.create());
        let title = derive_title(content, &self.title);
        let conversation = self.conversations.iter_mut().find(|c| c.id == id)?;
        if conversation.is_empty() {
            conversation.title = title;
        }
        conversation.append(Message::user(content));
        let history = conversation.messages.clone();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.entry(id).or_default().push(ticket);
        debug!(%id, ticket, messages = history.len(), "Recorded user message");
        self.persist();

        Some(PendingReply {
            conversation_id: id,
            ticket,
            history,
        })
    }

    /// Hand back the reply for ticket `ticket` of conversation `id`.
    ///
    /// Under [`ReplyPolicy::Supersede`] only the newest ticket of a
    /// conversation is appended; under [`ReplyPolicy::Overlap`] every reply
    /// is. Replies for deleted conversations are dropped.
    pub fn complete_reply(
        &mut self,
        id: ConversationId,
        ticket: u64,
        content: impl Into<String>,
        policy: ReplyPolicy,
    ) -> ReplyOutcome {
        let is_latest = self.pending.get(&id).and_then(|t| t.last()) == Some(&ticket);
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            debug!(%id, ticket, "Dropping reply for deleted conversation");
            return ReplyOutcome::Orphaned;
        };
        if !is_latest && policy == ReplyPolicy::Supersede {
            debug!(%id, ticket, "Dropping superseded reply");
            self.settle(id, ticket, policy);
            return ReplyOutcome::Superseded;
        }

        conversation.append(Message::assistant(content));
        self.settle(id, ticket, policy);
        debug!(%id, ticket, loading = self.is_loading(), "Appended assistant reply");
        self.persist();
        ReplyOutcome::Appended
    }

    /// Give up on ticket `ticket` of conversation `id` after a generation failure.
    pub fn abandon_reply(
        &mut self,
        id: ConversationId,
        ticket: u64,
        policy: ReplyPolicy,
        reason: &str,
    ) {
        self.settle(id, ticket, policy);
        warn!(%id, ticket, reason, "Reply abandoned");
        self.error = Some(format!("reply failed: {reason}"));
    }

    /// Settle every outstanding ticket after the reply tasks were cancelled.
    pub fn cancel_pending(&mut self) {
        let cancelled: usize = self.pending.values().map(Vec::len).sum();
        self.pending.clear();
        debug!(cancelled, "Cleared outstanding replies");
    }

    /// Mark `ticket` resolved. Under supersede, resolving the newest ticket
    /// also retires the older ones, whose tasks were cancelled.
    fn settle(&mut self, id: ConversationId, ticket: u64, policy: ReplyPolicy) {
        let Some(tickets) = self.pending.get_mut(&id) else {
            return;
        };
        if policy == ReplyPolicy::Supersede && tickets.last() == Some(&ticket) {
            tickets.clear();
        } else {
            tickets.retain(|t| *t != ticket);
        }
        if tickets.is_empty() {
            self.pending.remove(&id);
        }
    }

    /// Write the full list to storage, recording any failure in `error`.
    fn persist(&mut self) {
        match snapshot::persist(self.blob.as_ref(), &self.key, &self.conversations) {
            Ok(()) => self.error = None,
            Err(err) => {
                warn!(key = %self.key, %err, "Failed to persist conversations");
                self.error = Some(format!("failed to save conversations: {err}"));
            }
        }
    }
}
