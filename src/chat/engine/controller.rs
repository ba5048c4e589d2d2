//! Async front of the conversation store.
//!
//! `ChatController` owns the store behind a `RwLock`, exposes the
//! create/select/send/delete surface consumed by a presentation layer, and
//! turns each accepted message into a reply task spawned on tokio. Tasks are
//! keyed by conversation id so a newer message can cancel an older reply.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chat::core::config::{ChatConfig, ReplyPolicy};
use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::ConversationId;
use crate::chat::engine::store::{ConversationStore, PendingReply};
use crate::chat::reply::{CannedReplies, ReplyDelay, ReplyGenerator};
use crate::chat::storage::blob_store::BlobStore;
use crate::chat::view::ChatSnapshot;

type TaskMap = HashMap<ConversationId, Vec<JoinHandle<()>>>;

/// Shared chat state plus the scheduler for simulated replies.
pub struct ChatController {
    store: Arc<RwLock<ConversationStore>>,
    generator: Arc<dyn ReplyGenerator>,
    delay: Arc<ReplyDelay>,
    policy: ReplyPolicy,
    tasks: Mutex<TaskMap>,
}

impl ChatController {
    /// Assemble a controller from its parts.
    #[must_use]
    pub fn new(
        store: ConversationStore,
        generator: Arc<dyn ReplyGenerator>,
        delay: ReplyDelay,
        policy: ReplyPolicy,
    ) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            generator,
            delay: Arc::new(delay),
            policy,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Build a controller with canned replies, restoring state from `blob`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &ChatConfig, blob: Arc<dyn BlobStore>) -> ChatResult<Self> {
        config.validate()?;
        let store = ConversationStore::open(blob, config.storage.key.clone(), config.title.clone());
        let delay = ReplyDelay::from_config(&config.reply)?;
        info!(policy = ?config.reply.policy, "Chat controller ready");
        Ok(Self::new(
            store,
            Arc::new(CannedReplies::new()),
            delay,
            config.reply.policy,
        ))
    }

    /// Create a conversation and select it.
    pub async fn create(&self) -> ConversationId {
        self.store.write().await.create()
    }

    /// Select a conversation; unknown ids resolve to no current conversation.
    pub async fn select(&self, id: ConversationId) {
        self.store.write().await.select(id);
    }

    /// Delete a conversation and cancel its pending replies.
    pub async fn delete(&self, id: ConversationId) -> bool {
        let mut store = self.store.write().await;
        let removed = store.delete(id);
        if removed {
            self.cancel_tasks(id);
        }
        drop(store);
        removed
    }

    /// Record a user message and schedule the simulated reply.
    ///
    /// Returns the conversation the message went to, or `None` for blank input.
    pub async fn send(&self, content: &str) -> Option<ConversationId> {
        // Scheduling under the write guard keeps task order equal to ticket order.
        let mut store = self.store.write().await;
        let pending = store.submit(content)?;
        let id = pending.conversation_id;
        self.schedule(pending);
        drop(store);
        Some(id)
    }

    /// Read-only view for a presentation layer.
    pub async fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot::from_store(&*self.store.read().await)
    }

    /// Run `f` against the store under a read lock.
    pub async fn with_store<R>(&self, f: impl FnOnce(&ConversationStore) -> R + Send) -> R {
        f(&*self.store.read().await)
    }

    /// Wait until every scheduled reply has landed or been cancelled.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .lock_tasks()
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        debug!(tasks = handles.len(), "Flushing reply tasks");
        // Cancelled tasks report a JoinError; they have nothing left to do.
        let _ = futures::future::join_all(handles).await;
    }

    /// Cancel every scheduled reply and settle their tickets.
    pub async fn shutdown(&self) {
        let mut store = self.store.write().await;
        let count = {
            let mut tasks = self.lock_tasks();
            let count: usize = tasks.values().map(Vec::len).sum();
            for handle in tasks.drain().flat_map(|(_, handles)| handles) {
                handle.abort();
            }
            count
        };
        store.cancel_pending();
        drop(store);
        info!(cancelled = count, "Reply scheduler shut down");
    }

    fn schedule(&self, pending: PendingReply) {
        let PendingReply {
            conversation_id: id,
            ticket,
            history,
        } = pending;
        let delay = self.delay.sample();
        let store = Arc::clone(&self.store);
        let generator = Arc::clone(&self.generator);
        let policy = self.policy;

        debug!(%id, ticket, delay_ms = delay.as_millis(), "Scheduling reply");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match generator.generate(&history).await {
                Ok(content) => {
                    let outcome = store.write().await.complete_reply(id, ticket, content, policy);
                    debug!(%id, ticket, ?outcome, "Reply resolved");
                }
                Err(err) => {
                    store
                        .write()
                        .await
                        .abandon_reply(id, ticket, policy, &err.to_string());
                }
            }
        });

        let mut tasks = self.lock_tasks();
        let slot = tasks.entry(id).or_default();
        if policy == ReplyPolicy::Supersede {
            for previous in slot.drain(..) {
                previous.abort();
            }
        } else {
            slot.retain(|h| !h.is_finished());
        }
        slot.push(handle);
    }

    fn cancel_tasks(&self, id: ConversationId) {
        if let Some(handles) = self.lock_tasks().remove(&id) {
            for handle in handles {
                handle.abort();
            }
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, TaskMap> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in tasks.drain().flat_map(|(_, handles)| handles) {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::chat::core::config::{ReplyConfig, TitleConfig};
    use crate::chat::core::errors::ChatError;
    use crate::chat::core::message::{Message, Role};
    use crate::chat::reply::{CANNED_REPLIES, ReplyFuture};
    use crate::chat::storage::blob_store::MemoryBlobStore;
    use crate::chat::storage::snapshot;

    const KEY: &str = "chatbot-conversations";

    struct BrokenModel;

    impl ReplyGenerator for BrokenModel {
        fn generate<'a>(&'a self, _history: &'a [Message]) -> ReplyFuture<'a, ChatResult<String>> {
            Box::pin(async { Err(ChatError::InvalidRecord("model offline".to_string())) })
        }
    }

    fn controller_with(
        blob: Arc<MemoryBlobStore>,
        policy: ReplyPolicy,
        generator: Arc<dyn ReplyGenerator>,
    ) -> ChatController {
        let store = ConversationStore::open(blob, KEY, TitleConfig::default());
        let delay = ReplyDelay::with_seed(&ReplyConfig::default(), 11).expect("default delay range");
        ChatController::new(store, generator, delay, policy)
    }

    fn controller(policy: ReplyPolicy) -> (Arc<MemoryBlobStore>, ChatController) {
        let blob = Arc::new(MemoryBlobStore::new());
        let controller =
            controller_with(blob.clone(), policy, Arc::new(CannedReplies::with_seed(5)));
        (blob, controller)
    }

    fn roles(snapshot: &ChatSnapshot) -> Vec<Role> {
        snapshot
            .current_conversation
            .as_ref()
            .map(|c| c.messages.iter().map(|m| m.role).collect())
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_on_empty_store_then_reply_lands() {
        let (blob, controller) = controller(ReplyPolicy::Supersede);

        let id = controller.send("Hello there, how are you?").await;
        assert!(id.is_some());

        let before = controller.snapshot().await;
        assert_eq!(before.conversations.len(), 1);
        assert!(before.is_loading);
        assert_eq!(roles(&before), vec![Role::User]);
        assert_eq!(
            before.current_conversation.as_ref().map(|c| c.title.as_str()),
            Some("Hello there, how are you?")
        );

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(controller.snapshot().await.is_loading);

        controller.flush().await;
        let after = controller.snapshot().await;
        assert!(!after.is_loading);
        assert_eq!(roles(&after), vec![Role::User, Role::Assistant]);
        let reply = after
            .current_conversation
            .as_ref()
            .and_then(|c| c.last_message())
            .map(|m| m.content.clone())
            .unwrap_or_default();
        assert!(CANNED_REPLIES.contains(&reply.as_str()));

        let persisted = snapshot::restore(blob.as_ref(), KEY);
        assert_eq!(persisted, after.conversations);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_waits_for_the_minimum_delay() {
        let (_, controller) = controller(ReplyPolicy::Supersede);
        let _ = controller.send("ping").await;
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(roles(&controller.snapshot().await), vec![Role::User]);

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(
            roles(&controller.snapshot().await),
            vec![Role::User, Role::Assistant]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_schedules_nothing() {
        let (blob, controller) = controller(ReplyPolicy::Supersede);
        assert!(controller.send("").await.is_none());
        assert!(controller.send("   ").await.is_none());
        let snapshot = controller.snapshot().await;
        assert!(snapshot.conversations.is_empty());
        assert!(!snapshot.is_loading);
        assert!(blob.is_empty());
        assert!(controller.lock_tasks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_keeps_only_the_newest_reply() {
        let (_, controller) = controller(ReplyPolicy::Supersede);
        let _ = controller.send("first").await;
        let _ = controller.send("second").await;
        controller.flush().await;

        let snapshot = controller.snapshot().await;
        assert_eq!(roles(&snapshot), vec![Role::User, Role::User, Role::Assistant]);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlap_lands_both_replies() {
        let (_, controller) = controller(ReplyPolicy::Overlap);
        let _ = controller.send("first").await;
        let _ = controller.send("second").await;
        controller.flush().await;

        let snapshot = controller.snapshot().await;
        assert_eq!(
            roles(&snapshot),
            vec![Role::User, Role::User, Role::Assistant, Role::Assistant]
        );
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_go_to_their_own_conversation() {
        let (_, controller) = controller(ReplyPolicy::Supersede);
        let first = controller
            .send("in the first chat")
            .await
            .expect("message accepted");
        let second = controller.create().await;
        let _ = controller.send("in the second chat").await;
        controller.select(first).await;
        controller.flush().await;

        for id in [first, second] {
            let counts = controller
                .with_store(|store| {
                    store
                        .get(id)
                        .map(|c| (c.count_by_role(Role::User), c.count_by_role(Role::Assistant)))
                })
                .await;
            assert_eq!(counts, Some((1, 1)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_pending_reply() {
        let (_, controller) = controller(ReplyPolicy::Overlap);
        let id = controller.send("short lived").await.expect("message accepted");
        assert!(controller.delete(id).await);
        controller.flush().await;

        let snapshot = controller.snapshot().await;
        assert!(snapshot.conversations.is_empty());
        assert!(snapshot.current_conversation.is_none());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_unknown_leaves_state() {
        let (_, controller) = controller(ReplyPolicy::Supersede);
        let id = controller.create().await;
        assert!(!controller.delete(ConversationId::new()).await);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.current_conversation.map(|c| c.id), Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_failure_is_reported() {
        let blob = Arc::new(MemoryBlobStore::new());
        let controller = controller_with(blob, ReplyPolicy::Supersede, Arc::new(BrokenModel));
        let _ = controller.send("anyone there?").await;
        controller.flush().await;

        let snapshot = controller.snapshot().await;
        assert!(!snapshot.is_loading);
        assert_eq!(roles(&snapshot), vec![Role::User]);
        assert!(snapshot.error.is_some_and(|e| e.contains("model offline")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let (_, controller) = controller(ReplyPolicy::Overlap);
        let _ = controller.send("one").await;
        let _ = controller.send("two").await;
        controller.shutdown().await;
        tokio::time::sleep(Duration::from_millis(5000)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(roles(&snapshot), vec![Role::User, Role::User]);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_after_shutdown_settles_loading() {
        let (_, controller) = controller(ReplyPolicy::Overlap);
        let _ = controller.send("one").await;
        controller.shutdown().await;
        let _ = controller.send("two").await;
        controller.flush().await;

        let snapshot = controller.snapshot().await;
        assert_eq!(roles(&snapshot), vec![Role::User, Role::User, Role::Assistant]);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_under_supersede_settle() {
        let store = ConversationStore::open(
            Arc::new(MemoryBlobStore::new()),
            KEY,
            TitleConfig::default(),
        );
        let fast = ReplyConfig {
            min_delay_ms: 1,
            max_delay_ms: 5,
            ..ReplyConfig::default()
        };
        let delay = ReplyDelay::with_seed(&fast, 3).expect("valid delay range");
        let controller = Arc::new(ChatController::new(
            store,
            Arc::new(CannedReplies::with_seed(2)),
            delay,
            ReplyPolicy::Supersede,
        ));
        let id = controller.create().await;

        for round in 0..20 {
            let sends: Vec<_> = (0..4)
                .map(|n| {
                    let controller = Arc::clone(&controller);
                    tokio::spawn(async move {
                        controller.send(&format!("round {round} message {n}")).await
                    })
                })
                .collect();
            for send in futures::future::join_all(sends).await {
                assert_eq!(send.expect("send task"), Some(id));
            }
            controller.flush().await;

            let snapshot = controller.snapshot().await;
            assert!(!snapshot.is_loading, "round {round} left a reply outstanding");
            let last = snapshot
                .current_conversation
                .as_ref()
                .and_then(|c| c.last_message())
                .map(|m| m.role);
            assert_eq!(last, Some(Role::Assistant), "round {round} lost its reply");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_restores_previous_session() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let config = ChatConfig::default();
        {
            let controller = ChatController::from_config(&config, Arc::clone(&blob))
                .expect("default config is valid");
            let _ = controller.send("persist me").await;
            controller.flush().await;
        }
        let reopened =
            ChatController::from_config(&config, blob).expect("default config is valid");
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.conversations[0].messages.len(), 2);
        assert!(snapshot.current_conversation.is_none());
    }
}
