//! Key-value blob storage.
//!
//! A `BlobStore` keeps one string value per key, the same contract as
//! browser local storage. Operations are synchronous: the chat store
//! persists immediately after each mutation and waits for the write.

use dashmap::DashMap;

use crate::chat::core::errors::ChatResult;

/// Trait for single-value-per-key string storage.
pub trait BlobStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails. A missing key is `Ok(None)`.
    fn load(&self, key: &str) -> ChatResult<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn save(&self, key: &str, value: &str) -> ChatResult<()>;
}

/// Process-local blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: DashMap<String, String>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn save(&self, key: &str, value: &str) -> ChatResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty());
        assert!(matches!(store.load("k"), Ok(None)));

        assert!(store.save("k", "one").is_ok());
        assert!(store.save("k", "two").is_ok());
        assert_eq!(store.load("k").ok().flatten().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.load("other"), Ok(None)));
    }
}
