//! In-memory cache storage

use super::{CacheStorage, CacheStore};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::Response;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache storage held in process memory
#[derive(Default)]
pub struct MemoryStorage {
    caches: RwLock<BTreeMap<String, Arc<MemoryCache>>>,
    unavailable: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose `open` always fails, as when quota or permissions deny it
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            caches: RwLock::default(),
            unavailable: Some(reason.into()),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>> {
        if let Some(ref reason) = self.unavailable {
            return Err(ShellcacheError::store_open(name, reason));
        }

        let mut caches = self.caches.write().await;
        let cache: Arc<dyn CacheStore> = caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::new(name)))
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn names(&self) -> ShellcacheResult<Vec<String>> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }
}

/// One in-memory namespace
pub struct MemoryCache {
    name: String,
    entries: RwLock<BTreeMap<String, Response>>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::default(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, response: &Response) -> ShellcacheResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellcacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_and_reuses() {
        let storage = MemoryStorage::new();
        assert!(!storage.has("router-cache-v5").await.unwrap());

        let first = storage.open("router-cache-v5").await.unwrap();
        first
            .put("./app.js", &Response::new(200).with_body("one"))
            .await
            .unwrap();

        let second = storage.open("router-cache-v5").await.unwrap();
        let hit = second.lookup("./app.js").await.unwrap().unwrap();
        assert_eq!(hit.body, b"one");
        assert_eq!(storage.names().await.unwrap(), vec!["router-cache-v5"]);
    }

    #[tokio::test]
    async fn put_overwrites_whole_entry() {
        let storage = MemoryStorage::new();
        let cache = storage.open("c").await.unwrap();

        cache
            .put("k", &Response::new(200).with_header("etag", "a").with_body("old"))
            .await
            .unwrap();
        cache
            .put("k", &Response::new(200).with_body("new"))
            .await
            .unwrap();

        let hit = cache.lookup("k").await.unwrap().unwrap();
        assert_eq!(hit.body, b"new");
        assert!(hit.header("etag").is_none());
    }

    #[tokio::test]
    async fn delete_namespace() {
        let storage = MemoryStorage::new();
        storage.open("a").await.unwrap();
        assert!(storage.delete("a").await.unwrap());
        assert!(!storage.delete("a").await.unwrap());
        assert!(storage.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_storage_fails_open() {
        let storage = MemoryStorage::unavailable("quota exceeded");
        let err = storage.open("router-cache-v5").await.err().unwrap();
        assert!(matches!(err, ShellcacheError::StoreOpen { .. }));
    }
}
