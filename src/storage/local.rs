use std::path::{Component, Path, PathBuf};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::fs;

use crate::storage::ObjectStore;

/// Object store on the local filesystem, served over HTTP under `/storage`.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self { base_dir, base_url }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    pub fn get_public_url(&self, key: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let key = key.trim_start_matches('/');
        format!("{base}/{key}")
    }

    /// Maps a key onto the base directory, refusing keys that would escape it.
    pub fn resolve_path(&self, key: &str) -> Result<PathBuf> {
        let normalized = Path::new(key.trim_start_matches('/'));
        if normalized
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(anyhow!("invalid storage key: {key}"));
        }
        Ok(self.base_dir.join(normalized))
    }
}

#[async_trait]
impl ObjectStore for LocalFileStorage {
    async fn upload(&self, path: &str, data: &[u8], _content_type: &str) -> Result<String> {
        self.put(path, data).await?;
        Ok(path.trim_start_matches('/').to_string())
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.get(path).await
    }

    fn public_url(&self, path: &str) -> String {
        self.get_public_url(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf(), "http://localhost:3000/storage/".into());
        let path = storage.upload("public/a.png", b"png-bytes", "image/png").await.unwrap();
        assert_eq!(path, "public/a.png");
        assert_eq!(storage.download(&path).await.unwrap().as_deref(), Some(&b"png-bytes"[..]));
        assert_eq!(
            storage.public_url(&path),
            "http://localhost:3000/storage/public/a.png"
        );
    }

    #[tokio::test]
    async fn missing_objects_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf(), "http://x".into());
        assert_eq!(storage.download("public/none.png").await.unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_base_dir() {
        let storage = LocalFileStorage::new(PathBuf::from("/data"), "http://x".into());
        assert!(storage.resolve_path("../etc/passwd").is_err());
        assert!(storage.resolve_path("public/../../x").is_err());
        assert_eq!(
            storage.resolve_path("/public/a.png").unwrap(),
            PathBuf::from("/data/public/a.png")
        );
    }
}
