//! Chat subsystem: conversations, persistence and simulated replies.
//!
//! Organized into:
//! - `core`: Configuration, errors, IDs, messages, conversations and titles
//! - `storage`: Key-value blob backends and the persisted snapshot format
//! - `reply`: Reply generator seam, canned replies and delay sampling
//! - `engine`: The conversation store and the async reply scheduler
//! - `view`: Snapshots and sidebar grouping for a presentation layer

pub mod core;
pub mod engine;
pub mod reply;
pub mod storage;
pub mod view;

// Re-export commonly used types for convenience
pub use self::core::{
    ChatConfig, ChatError, ChatResult, Conversation, ConversationId, Message, MessageId,
    ReplyConfig, ReplyPolicy, Role, StorageBackend, StorageConfig, TitleConfig, derive_title,
};
pub use engine::{ChatController, ConversationStore, PendingReply, ReplyOutcome};
pub use reply::{CANNED_REPLIES, CannedReplies, ReplyDelay, ReplyFuture, ReplyGenerator};
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore, open_blob_store};
pub use view::{ChatSnapshot, ConversationSummary, RecencyGroup, group_by_recency};
