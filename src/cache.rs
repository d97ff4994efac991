//! Named cache generations and their in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::http::Response;

/// Abstraction over versioned response caches, keyed by generation name and
/// then by request cache key.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Returns every generation name, oldest first.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Creates the generation if it does not exist yet.
    async fn open(&self, name: &str) -> Result<()>;

    /// Returns true if the generation exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Looks up `key` in one generation.
    async fn match_in(&self, name: &str, key: &str) -> Result<Option<Response>>;

    /// Looks up `key` across all generations, oldest first.
    async fn match_any(&self, key: &str) -> Result<Option<Response>>;

    /// Stores a response, creating the generation if needed.
    async fn put(&self, name: &str, key: &str, response: Response) -> Result<()>;

    /// Deletes a generation. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
struct Generations {
    order: Vec<String>,
    entries: HashMap<String, HashMap<String, Response>>,
}

impl Generations {
    fn open(&mut self, name: &str) -> &mut HashMap<String, Response> {
        if !self.entries.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.entries.entry(name.to_string()).or_default()
    }
}

/// In-memory cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    inner: RwLock<Generations>,
}

impl MemoryCacheStorage {
    /// Creates an empty cache storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in a generation, or `None` if absent.
    pub async fn len_of(&self, name: &str) -> Option<usize> {
        self.inner.read().await.entries.get(name).map(HashMap::len)
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn open(&self, name: &str) -> Result<()> {
        self.inner.write().await.open(name);
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.inner.read().await.entries.contains_key(name))
    }

    async fn match_in(&self, name: &str, key: &str) -> Result<Option<Response>> {
        Ok(self
            .inner
            .read()
            .await
            .entries
            .get(name)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|name| inner.entries.get(name))
            .find_map(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> Result<()> {
        self.inner
            .write()
            .await
            .open(name)
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|n| n != name);
        Ok(inner.entries.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_match() {
        let caches = MemoryCacheStorage::new();
        caches.put("static-v1", "/", Response::ok("home")).await.unwrap();

        let hit = caches.match_in("static-v1", "/").await.unwrap().unwrap();
        assert_eq!(hit.body, "home");
        assert!(caches.match_in("static-v1", "/x").await.unwrap().is_none());
        assert!(caches.match_in("other", "/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_in_creation_order() {
        let caches = MemoryCacheStorage::new();
        caches.open("b").await.unwrap();
        caches.open("a").await.unwrap();
        caches.open("b").await.unwrap();
        assert_eq!(caches.keys().await.unwrap(), ["b", "a"]);
        assert_eq!(caches.len_of("a").await, Some(0));
    }

    #[tokio::test]
    async fn match_any_prefers_oldest_generation() {
        let caches = MemoryCacheStorage::new();
        caches.put("first", "/k", Response::ok("1")).await.unwrap();
        caches.put("second", "/k", Response::ok("2")).await.unwrap();
        caches.put("second", "/only", Response::ok("3")).await.unwrap();

        assert_eq!(caches.match_any("/k").await.unwrap().unwrap().body, "1");
        assert_eq!(caches.match_any("/only").await.unwrap().unwrap().body, "3");
        assert!(caches.match_any("/none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let caches = MemoryCacheStorage::new();
        caches.open("gen").await.unwrap();
        assert!(caches.delete("gen").await.unwrap());
        assert!(!caches.delete("gen").await.unwrap());
        assert!(!caches.has("gen").await.unwrap());
        assert!(caches.keys().await.unwrap().is_empty());
    }
}
