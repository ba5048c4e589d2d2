//! Error types for the chat store.

use thiserror::Error;

/// Chat store error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A persisted record that does not fit the data model.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
