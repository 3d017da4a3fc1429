use std::path::PathBuf;

use async_trait::async_trait;

use super::kv::{KvStore, StoreError};

/// Store backed by one file per key under a base folder. Keys are used as
/// file names verbatim, so they must name a file inside the folder.
pub struct FileStore {
    folder: PathBuf,
}

impl FileStore {
    pub fn new(folder: PathBuf) -> Self {
        FileStore { folder }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(StoreError::Backend(format!(
                "key is not a file name: {}",
                key
            )));
        }
        Ok(self.folder.join(key))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.key_path(key)?).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.folder).await?;
        tokio::fs::write(self.key_path(key)?, value).await?;
        Ok(())
    }
}
