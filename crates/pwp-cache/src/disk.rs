//! On-disk cache backend.
//!
//! Each named cache is a directory; each entry is one JSON file named by
//! the SHA-256 of its key. Writes go to a temporary file first and are
//! renamed into place, so a reader sees either the old or the new entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pwp_core::Response;
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use crate::store::{CacheStorage, CacheStore, CachedResponse};

const ENTRY_EXT: &str = "json";

/// A cache directory.
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    dir: PathBuf,
}

impl DiskCacheStore {
    /// Open (creating if needed) a cache directory.
    pub async fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let digest = Sha256::digest(key.as_str().as_bytes());
        self.dir.join(format!("{}.{}", hex::encode(digest), ENTRY_EXT))
    }

    async fn read_entry(path: &Path) -> CacheResult<Option<CachedResponse>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn match_key(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        match Self::read_entry(&self.entry_path(key)).await? {
            Some(entry) if entry.key == *key => Ok(Some(entry.into_response()?)),
            Some(entry) => Err(CacheError::Storage(format!(
                "entry for {} holds {}",
                key, entry.key
            ))),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, response: Response) -> CacheResult<()> {
        let entry = CachedResponse::capture(key, &response);
        let bytes = serde_json::to_vec(&entry)?;

        let path = self.entry_path(key);
        let tmp = path.with_extension(format!("{}.{}.tmp", ENTRY_EXT, Uuid::new_v4().simple()));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == ENTRY_EXT) {
                if let Some(entry) = Self::read_entry(&path).await? {
                    keys.push(entry.key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Named cache directories under one root.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(CacheError::Storage(format!("invalid cache name: {:?}", name)));
        }
        let store: Arc<dyn CacheStore> = Arc::new(DiskCacheStore::open(self.root.join(name)).await?);
        Ok(store)
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn key(url: &str) -> CacheKey {
        CacheKey::new(&Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        let k = key("http://localhost/header.php?fragment=true");

        let store = storage.open("pwp").await.unwrap();
        store
            .put(&k, Response::ok("<header>").with_etag("\"h1\""))
            .await
            .unwrap();
        drop(store);

        let reopened = DiskCacheStorage::new(dir.path()).open("pwp").await.unwrap();
        let hit = reopened.match_key(&k).await.unwrap().unwrap();
        assert_eq!(hit.body().as_ref(), b"<header>");
        assert_eq!(hit.etag(), Some("\"h1\""));
        assert_eq!(reopened.keys().await.unwrap(), vec![k]);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::open(dir.path().join("pwp")).await.unwrap();
        let k = key("http://localhost/lazy.css");

        store.put(&k, Response::ok("a")).await.unwrap();
        store.put(&k, Response::ok("b")).await.unwrap();
        assert_eq!(store.keys().await.unwrap().len(), 1);
        assert_eq!(store.match_key(&k).await.unwrap().unwrap().body().as_ref(), b"b");

        assert!(store.delete(&k).await.unwrap());
        assert!(!store.delete(&k).await.unwrap());
        assert!(store.match_key(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_names_and_invalid_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path().join("caches"));
        assert!(storage.names().await.unwrap().is_empty());

        storage.open("pwp").await.unwrap();
        assert_eq!(storage.names().await.unwrap(), vec!["pwp"]);
        assert!(storage.open("../escape").await.is_err());
    }
}
