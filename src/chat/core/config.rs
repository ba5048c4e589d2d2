//! Configuration for the chat store.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Top-level configuration for the chat store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Simulated reply settings.
    pub reply: ReplyConfig,
    /// Conversation title settings.
    pub title: TitleConfig,
}

impl ChatConfig {
    /// Build a configuration from defaults overridden by `CHATBOT_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from defaults overridden by a variable lookup.
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CHATBOT_STORAGE_BACKEND") {
            config.storage.backend = value.parse()?;
        }
        if let Some(value) = lookup("CHATBOT_STORAGE_DIR") {
            config.storage.dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("CHATBOT_STORAGE_KEY") {
            config.storage.key = value;
        }
        if let Some(value) = lookup("CHATBOT_REPLY_MIN_MS") {
            config.reply.min_delay_ms = parse_millis("CHATBOT_REPLY_MIN_MS", &value)?;
        }
        if let Some(value) = lookup("CHATBOT_REPLY_MAX_MS") {
            config.reply.max_delay_ms = parse_millis("CHATBOT_REPLY_MAX_MS", &value)?;
        }
        if let Some(value) = lookup("CHATBOT_REPLY_POLICY") {
            config.reply.policy = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        let key = self.storage.key.as_str();
        if key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.key must not be empty".to_string(),
            ));
        }
        if let Some(ch) = key
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')))
        {
            return Err(ChatError::InvalidConfig(format!(
                "storage.key contains invalid character {ch:?}"
            )));
        }

        if self.reply.min_delay_ms >= self.reply.max_delay_ms {
            return Err(ChatError::InvalidConfig(format!(
                "reply.min_delay_ms ({}) must be < reply.max_delay_ms ({})",
                self.reply.min_delay_ms, self.reply.max_delay_ms
            )));
        }

        if self.title.max_words == 0 {
            return Err(ChatError::InvalidConfig(
                "title.max_words must be > 0".to_string(),
            ));
        }

        if self.title.placeholder.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "title.placeholder must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_millis(name: &str, value: &str) -> ChatResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|err| ChatError::InvalidConfig(format!("{name}={value:?}: {err}")))
}

/// Where the conversation blob is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One JSON file per key inside `StorageConfig::dir`.
    #[default]
    File,
    /// A key-value table in `StorageConfig::dir/chatbot.sqlite`.
    Sqlite,
    /// Process memory only; nothing survives a restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ChatError::InvalidConfig(format!(
                "unknown storage backend {other:?} (expected file, sqlite or memory)"
            ))),
        }
    }
}

/// Storage configuration for the persisted blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// Directory holding the backend's files.
    pub dir: PathBuf,
    /// Fixed key the conversation list is stored under.
    pub key: String,
}

impl StorageConfig {
    /// File name of the `SQLite` database inside `dir`.
    pub const SQLITE_FILE: &'static str = "chatbot.sqlite";

    /// Path of the `SQLite` database for the `Sqlite` backend.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.dir.join(Self::SQLITE_FILE)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: PathBuf::from(".chatbot"),
            key: "chatbot-conversations".to_string(),
        }
    }
}

/// What happens when a message is sent while an earlier reply for the same
/// conversation is still pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPolicy {
    /// Cancel the pending reply; only the newest one lands.
    #[default]
    Supersede,
    /// Let every scheduled reply land independently.
    Overlap,
}

impl FromStr for ReplyPolicy {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supersede" => Ok(Self::Supersede),
            "overlap" => Ok(Self::Overlap),
            other => Err(ChatError::InvalidConfig(format!(
                "unknown reply policy {other:?} (expected supersede or overlap)"
            ))),
        }
    }
}

/// Simulated reply settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Inclusive lower bound of the reply delay.
    pub min_delay_ms: u64,
    /// Exclusive upper bound of the reply delay.
    pub max_delay_ms: u64,
    /// Overlap handling for replies to the same conversation.
    pub policy: ReplyPolicy,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            policy: ReplyPolicy::Supersede,
        }
    }
}

/// Conversation title settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Number of leading words kept from the first user message.
    pub max_words: usize,
    /// Source length in characters above which an ellipsis is appended.
    pub max_chars: usize,
    /// Title of a conversation without messages.
    pub placeholder: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            max_words: 6,
            max_chars: 50,
            placeholder: "New Chat".to_string(),
        }
    }
}
