// Versioned response buckets.
// Generation naming plus the bucket storage contract and its in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::APP_NAME;
use crate::error::Result;

use super::request::{Request, Response};

/// One deployment's bucket name: shared prefix plus a generation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    prefix: String,
    tag: String,
}

impl Generation {
    pub fn new(prefix: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tag: tag.into(),
        }
    }

    /// Generation for this application keyed by a fixed build identifier.
    pub fn for_build(build_id: &str) -> Self {
        Self::new(default_prefix(), build_id)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn bucket_name(&self) -> String {
        format!("{}{}", self.prefix, self.tag)
    }

    /// A bucket from an earlier deployment of this application.
    pub fn supersedes(&self, bucket: &str) -> bool {
        bucket.starts_with(&self.prefix) && bucket != self.bucket_name()
    }
}

/// `rustyclint-cache-v`
pub fn default_prefix() -> String {
    format!("{}-cache-v", APP_NAME)
}

/// Named buckets of request/response pairs.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist.
    async fn open(&self, bucket: &str) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;

    /// Returns whether a bucket was removed.
    async fn delete(&self, bucket: &str) -> Result<bool>;

    /// Store a response, creating the bucket if needed.
    async fn put(&self, bucket: &str, request: &Request, response: Response) -> Result<()>;

    async fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<Response>>;

    /// First match across all buckets, oldest bucket first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>>;
}

type Bucket = HashMap<String, Response>;

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    // Vec keeps creation order for match_any.
    buckets: RwLock<Vec<(String, Bucket)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        if !buckets.iter().any(|(name, _)| name == bucket) {
            buckets.push((bucket.to_string(), Bucket::new()));
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete(&self, bucket: &str) -> Result<bool> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|(name, _)| name != bucket);
        Ok(buckets.len() != before)
    }

    async fn put(&self, bucket: &str, request: &Request, response: Response) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        let key = request.cache_key();

        match buckets.iter_mut().find(|(name, _)| name == bucket) {
            Some((_, entries)) => {
                entries.insert(key, response);
            }
            None => {
                let mut entries = Bucket::new();
                entries.insert(key, response);
                buckets.push((bucket.to_string(), entries));
            }
        }
        Ok(())
    }

    async fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<Response>> {
        let key = request.cache_key();
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .find(|(name, _)| name == bucket)
            .and_then(|(_, entries)| entries.get(&key).cloned()))
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        let key = request.cache_key();
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .find_map(|(_, entries)| entries.get(&key).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::request::ResponseKind;
    use reqwest::StatusCode;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get_path(&Url::parse("http://localhost:5173").unwrap(), path).unwrap()
    }

    fn response(body: &str) -> Response {
        Response::new(
            StatusCode::OK,
            ResponseKind::Basic,
            Url::parse("http://localhost:5173/").unwrap(),
            body,
        )
    }

    #[test]
    fn test_generation_naming() {
        let generation = Generation::for_build("0.3.1");
        assert_eq!(generation.bucket_name(), "rustyclint-cache-v0.3.1");
        assert!(generation.supersedes("rustyclint-cache-v0.3.0"));
        assert!(!generation.supersedes("rustyclint-cache-v0.3.1"));
        assert!(!generation.supersedes("other-app-cache-v1"));
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryCacheStorage::new();
        storage.put("b1", &request("/a.png"), response("a")).await.unwrap();

        let hit = storage.match_in("b1", &request("/a.png")).await.unwrap();
        assert_eq!(hit.unwrap().text(), "a");
        assert!(storage.match_in("b2", &request("/a.png")).await.unwrap().is_none());
        assert!(storage.match_any(&request("/b.png")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_bucket() {
        let storage = MemoryCacheStorage::new();
        storage.put("old", &request("/a.png"), response("old")).await.unwrap();
        storage.put("new", &request("/a.png"), response("new")).await.unwrap();

        let hit = storage.match_any(&request("/a.png")).await.unwrap().unwrap();
        assert_eq!(hit.text(), "old");
    }

    #[tokio::test]
    async fn test_open_and_delete() {
        let storage = MemoryCacheStorage::new();
        storage.open("b1").await.unwrap();
        storage.open("b1").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["b1"]);

        assert!(storage.delete("b1").await.unwrap());
        assert!(!storage.delete("b1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
