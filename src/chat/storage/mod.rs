//! Persistence backends and the conversation snapshot format.

pub mod blob_store;
pub mod file_store;
pub mod snapshot;
pub mod sqlite_store;

use std::sync::Arc;

use tracing::info;

use crate::chat::core::config::{StorageBackend, StorageConfig};
use crate::chat::core::errors::ChatResult;

pub use blob_store::{BlobStore, MemoryBlobStore};
pub use file_store::FileBlobStore;
pub use sqlite_store::SqliteBlobStore;

/// Open the blob store selected by `config`.
///
/// # Errors
/// Returns an error if the backend cannot be initialized.
pub fn open_blob_store(config: &StorageConfig) -> ChatResult<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::File => Arc::new(FileBlobStore::open(&config.dir)?),
        StorageBackend::Sqlite => Arc::new(SqliteBlobStore::open(config.sqlite_path())?),
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };
    info!(backend = ?config.backend, key = %config.key, "Opened conversation storage");
    Ok(store)
}
