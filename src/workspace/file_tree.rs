// Workspace file tree loading.
// Fetches the tree from the file-tree endpoint and keeps a copy in the expiring store.

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::cache::{ExpiringStore, file_tree_key, ttl};
use crate::error::{CacheError, Result};

use super::types::FileNode;

const FILE_TREE_ENDPOINT: &str = "/api/file-tree";

/// Client for the workspace file tree, cached for [`ttl::VERY_LONG`].
pub struct FileTreeClient {
    client: Client,
    endpoint: Url,
    store: ExpiringStore,
}

impl FileTreeClient {
    pub fn new(origin: &Url, store: ExpiringStore) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: origin.join(FILE_TREE_ENDPOINT)?,
            store,
        })
    }

    /// Cached tree, fetched from the server on a miss.
    pub async fn load(&self) -> Result<Vec<FileNode>> {
        self.store
            .get_or_compute(&file_tree_key(), || self.fetch(), ttl::VERY_LONG, false)
            .await
    }

    /// Fetch a fresh tree and replace the cached copy.
    pub async fn refresh(&self) -> Result<Vec<FileNode>> {
        let tree = self
            .store
            .get_or_compute(&file_tree_key(), || self.fetch(), ttl::VERY_LONG, true)
            .await?;
        self.save(&tree).await;
        Ok(tree)
    }

    /// Persist a locally modified tree (folders toggled open, files added).
    pub async fn save(&self, tree: &[FileNode]) {
        if !self.store.set(&file_tree_key(), tree, ttl::VERY_LONG).await {
            warn!("Error saving file tree");
        }
    }

    async fn fetch(&self) -> Result<Vec<FileNode>> {
        debug!(url = %self.endpoint, "Fetching file tree");

        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| CacheError::Network {
                url: self.endpoint.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(CacheError::Network {
                url: self.endpoint.to_string(),
                reason: format!("HTTP {}", status),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client(store: ExpiringStore) -> FileTreeClient {
        FileTreeClient::new(&Url::parse("http://127.0.0.1:9").unwrap(), store).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let client = unreachable_client(ExpiringStore::in_memory());
        assert_eq!(client.endpoint.as_str(), "http://127.0.0.1:9/api/file-tree");
    }

    #[tokio::test]
    async fn test_load_serves_cached_tree_without_network() {
        let store = ExpiringStore::in_memory();
        let client = unreachable_client(store.clone());
        let tree = vec![FileNode::folder("src", vec![FileNode::file("main.rs")])];

        client.save(&tree).await;
        assert_eq!(client.load().await.unwrap(), tree);
    }

    #[tokio::test]
    async fn test_load_miss_propagates_fetch_error() {
        let client = unreachable_client(ExpiringStore::in_memory());
        assert!(matches!(client.load().await, Err(CacheError::Network { .. })));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let store = ExpiringStore::in_memory();
        let client = unreachable_client(store.clone());
        client.save(&[FileNode::file("README.md")]).await;

        assert!(client.refresh().await.is_err());
        // A failed refresh leaves the cached tree alone.
        assert_eq!(
            store.get::<Vec<FileNode>>(&file_tree_key()).await,
            Some(vec![FileNode::file("README.md")])
        );
    }
}
