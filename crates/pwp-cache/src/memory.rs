//! In-process cache backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use pwp_core::Response;

use crate::error::CacheResult;
use crate::key::CacheKey;
use crate::store::{CacheStorage, CacheStore};

/// In-memory store. Entries live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, Response>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn match_key(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, response: Response) -> CacheResult<()> {
        self.entries.write().insert(key.clone(), response);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Named in-memory stores.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<BTreeMap<String, Arc<MemoryCacheStore>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>> {
        let store: Arc<dyn CacheStore> = self
            .caches
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCacheStore::new()))
            .clone();
        Ok(store)
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        Ok(self.caches.lock().keys().cloned().collect())
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
    async fn test_put_overwrites() {
        let store = MemoryCacheStore::new();
        let k = key("http://localhost/lazy.css");

        store.put(&k, Response::ok("v1")).await.unwrap();
        store.put(&k, Response::ok("v2")).await.unwrap();

        assert_eq!(store.len(), 1);
        let hit = store.match_key(&k).await.unwrap().unwrap();
        assert_eq!(hit.body().as_ref(), b"v2");
    }

    #[tokio::test]
    async fn test_delete_and_miss() {
        let store = MemoryCacheStore::new();
        let k = key("http://localhost/a.js");
        assert!(store.match_key(&k).await.unwrap().is_none());
        assert!(!store.delete(&k).await.unwrap());

        store.put(&k, Response::ok("x")).await.unwrap();
        assert!(store.delete(&k).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_open_same_name_shares_entries() {
        let storage = MemoryCacheStorage::new();
        let k = key("http://localhost/");

        storage.open("pwp").await.unwrap().put(&k, Response::ok("page")).await.unwrap();

        let again = storage.open("pwp").await.unwrap();
        assert!(again.match_key(&k).await.unwrap().is_some());
        let other = storage.open("other").await.unwrap();
        assert!(other.match_key(&k).await.unwrap().is_none());
        assert_eq!(storage.names().await.unwrap(), vec!["other", "pwp"]);
    }
}
