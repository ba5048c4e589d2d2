//! Conversation state and reply scheduling.

pub mod controller;
pub mod store;

pub use controller::ChatController;
pub use store::{ConversationStore, PendingReply, ReplyOutcome};
