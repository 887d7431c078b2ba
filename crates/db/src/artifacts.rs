//! Filesystem-backed [`ArtifactStore`].
//!
//! Objects are written below `base_dir` and served by the API under
//! `public_base_url` (see the `/artifacts` route).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use prodgen_core::artifact::{ArtifactError, ArtifactStore, StoredArtifact};

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `key` below the base directory, refusing anything that
    /// would escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(ArtifactError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid artifact key '{key}'"),
            )));
        }
        Ok(self.base_dir.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<StoredArtifact, ArtifactError> {
        if bytes.is_empty() {
            return Err(ArtifactError::Empty);
        }
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(key, size = bytes.len(), "Artifact written");

        Ok(StoredArtifact {
            key: key.to_string(),
            url: format!("{}/{key}", self.public_base_url.trim_end_matches('/')),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn writes_nested_key_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), "http://localhost:3000/artifacts");

        let stored = store.put("7/image_abc.png", b"png-bytes".to_vec()).await.unwrap();

        assert_eq!(stored.url, "http://localhost:3000/artifacts/7/image_abc.png");
        let on_disk = std::fs::read(dir.path().join("7/image_abc.png")).unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn same_key_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), "http://h");
        store.put("1/a.png", b"one".to_vec()).await.unwrap();
        store.put("1/a.png", b"two".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("1/a.png")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn rejects_keys_outside_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), "http://h");
        assert_matches!(
            store.put("../escape.png", b"x".to_vec()).await,
            Err(ArtifactError::Io(_))
        );
        assert_matches!(
            store.put("/abs.png", b"x".to_vec()).await,
            Err(ArtifactError::Io(_))
        );
    }
}
