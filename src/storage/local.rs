//! Directory-backed artifact store.
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::{AppError, AppResult};
use crate::storage::ArtifactStore;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open the storage directory, creating it when absent.
    pub async fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let root = dir.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::Storage(format!("Failed to create storage directory {}: {}", root.display(), e))
        })?;
        Ok(LocalStore { root })
    }
}

// Storage names are single path components; anything that could walk out of
// the directory is refused.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> AppResult<()> {
        if !is_safe_name(name) {
            return Err(AppError::Storage(format!("Refusing to store under name '{}'", name)));
        }
        fs::write(self.root.join(name), bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", name, e)))
    }

    async fn get(&self, name: &str) -> AppResult<Vec<u8>> {
        if !is_safe_name(name) {
            return Err(AppError::NotFound(name.to_string()));
        }
        match fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(name.to_string())),
            Err(e) => Err(AppError::Storage(format!("Failed to read {}: {}", name, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.put("42-out.png", b"png bytes").await.unwrap();
        let bytes = store.get("42-out.png").await.unwrap();
        assert_eq!(bytes, b"png bytes");
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let err = store.get("never-written.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_names_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let err = store.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = store.put("../escape.png", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(store.put("..", b"x").await.is_err());
        assert!(store.put("a/b.png", b"x").await.is_err());
    }

    #[tokio::test]
    async fn open_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("images");
        let store = LocalStore::open(&nested).await.unwrap();

        store.put("x.png", b"x").await.unwrap();
        assert!(nested.join("x.png").exists());
    }
}
