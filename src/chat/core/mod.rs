//! Core chat types and identifiers.

pub mod config;
pub mod conversation;
pub mod errors;
pub mod ids;
pub mod message;
pub mod time;
pub mod title;

pub use config::{ChatConfig, ReplyConfig, ReplyPolicy, StorageBackend, StorageConfig, TitleConfig};
pub use conversation::Conversation;
pub use errors::{ChatError, ChatResult};
pub use ids::{ConversationId, MessageId};
pub use message::{Message, Role};
pub use title::derive_title;
