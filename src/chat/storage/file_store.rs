//! Directory-backed blob store: one `<key>.json` file per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::chat::core::errors::ChatResult;
use crate::chat::storage::blob_store::BlobStore;

/// Blob store writing each key to its own file.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (and create if needed) the storage directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> ChatResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file blob store");
        Ok(Self { dir })
    }

    /// Path of the file holding `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> ChatResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> ChatResult<()> {
        // Write beside the target then rename so a crash never leaves half a blob.
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}
