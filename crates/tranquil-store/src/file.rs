//! File-backed session store using `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{SessionStore, StoreError};

/// A [`SessionStore`] that keeps the record in a single file.
///
/// Writes go to a sibling `*.tmp` file first and are then renamed over the
/// real path, so a crash mid-write leaves either the old record or the new
/// one, never half of each.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store at `path`. Nothing is touched on disk until the
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file the record lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileStore {
    async fn get(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, data: Vec<u8>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), bytes = data.len(), "session record written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_parent_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/deeper/session.json"));

        store.set(b"{\"a\":1}".to_vec()).await.unwrap();

        assert_eq!(store.get().await.unwrap(), Some(b"{\"a\":1}".to_vec()));
        assert!(!store.temp_path().exists(), "temp file should be renamed away");
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));

        store.set(b"first".to_vec()).await.unwrap();
        store.set(b"second".to_vec()).await.unwrap();

        assert_eq!(store.get().await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set(b"x".to_vec()).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = FileStore::new("/data/app/session.json");
        assert_eq!(store.temp_path(), PathBuf::from("/data/app/session.json.tmp"));
    }
}
