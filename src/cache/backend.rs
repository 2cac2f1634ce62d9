// Persistent storage backends for the expiring store.
// Untyped JSON key/value contract plus in-memory and file-system implementations.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Asynchronous key/value storage holding JSON values.
///
/// Each individual operation is atomic; sequences of operations are not.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    async fn set_item(&self, key: &str, value: Value) -> Result<()>;

    /// Removing a missing key succeeds.
    async fn remove_item(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;
}

/// Process-local backend. Used in tests and when no cache directory exists.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.items.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

/// On-disk record. The key is kept inside the file since file names are hashed.
#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    key: String,
    value: Value,
}

/// Backend storing one JSON file per key under a region directory.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    ready: OnceCell<()>,
}

impl FileBackend {
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the region directory. Idempotent.
    pub async fn init(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.root).await?;
                debug!(root = %self.root.display(), "Initialized file cache region");
                Ok::<(), CacheError>(())
            })
            .await?;
        Ok(())
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    async fn read_item(path: &Path) -> Result<Option<StoredItem>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Unique per write, so concurrent writers of one key never share a temp file.
    fn temp_path(&self, item_path: &Path) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        item_path.with_extension(format!("{}-{}.tmp", std::process::id(), seq))
    }

    async fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }

    /// Committed entries only.
    async fn item_paths(&self) -> Result<Vec<PathBuf>> {
        self.region_files(&["json"]).await
    }

    async fn region_files(&self, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| extensions.iter().any(|wanted| ext == *wanted))
            {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let item = Self::read_item(&self.item_path(key)).await?;
        // A hash collision would surface as a foreign key; treat it as absent.
        Ok(item.filter(|item| item.key == key).map(|item| item.value))
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.init().await?;

        let path = self.item_path(key);
        let json = serde_json::to_vec(&StoredItem {
            key: key.to_string(),
            value,
        })?;

        // Write atomically via a temp file private to this write
        let temp_path = self.temp_path(&path);
        let written = match Self::write_file(&temp_path, &json).await {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.item_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut first_error = None;

        // Leftover temp files from interrupted writes go too.
        for path in self.region_files(&["json", "tmp"]).await? {
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to delete cache file");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.item_paths().await? {
            match Self::read_item(&path).await {
                Ok(Some(item)) => keys.push(item.key),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable cache file")
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ExpiringStore, ttl};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();

        backend.set_item("a", json!({"n": 1})).await.unwrap();
        assert_eq!(backend.get_item("a").await.unwrap(), Some(json!({"n": 1})));

        backend.remove_item("a").await.unwrap();
        backend.remove_item("a").await.unwrap();
        assert_eq!(backend.get_item("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backend_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("rustyclint").join("app-cache-v2");

        let backend = FileBackend::new(&root);
        backend
            .set_item("editor:tabs:v2", json!(["main.rs"]))
            .await
            .unwrap();

        let reopened = FileBackend::new(&root);
        assert_eq!(
            reopened.get_item("editor:tabs:v2").await.unwrap(),
            Some(json!(["main.rs"]))
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["editor:tabs:v2"]);
    }

    #[tokio::test]
    async fn test_file_backend_missing_dir_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("never-created"));

        assert_eq!(backend.get_item("x").await.unwrap(), None);
        assert!(backend.keys().await.unwrap().is_empty());
        backend.remove_item("x").await.unwrap();
        backend.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_backend_clear() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        for key in ["a", "b", "c"] {
            backend.set_item(key, json!(key)).await.unwrap();
        }
        backend.clear().await.unwrap();

        assert!(backend.keys().await.unwrap().is_empty());
        assert_eq!(backend.get_item("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backend_clear_removes_stray_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        backend.set_item("a", json!(1)).await.unwrap();
        let stray = backend.item_path("b").with_extension("1234-0.tmp");
        std::fs::write(&stray, b"{\"key\": \"b\"").unwrap();

        backend.clear().await.unwrap();

        assert!(!stray.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_file_backend_temp_paths_are_unique() {
        let backend = FileBackend::new("/tmp/region");
        let item = backend.item_path("k");
        assert_ne!(backend.temp_path(&item), backend.temp_path(&item));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_sets_on_one_key_keep_an_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = ExpiringStore::new(Arc::new(FileBackend::new(temp_dir.path())));

        for round in 0..100 {
            let writers: Vec<_> = (0..8)
                .map(|writer| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store
                            .set("editor:tabs:v2", &vec![round, writer], ttl::VERY_LONG)
                            .await
                    })
                })
                .collect();

            for writer in writers {
                assert!(writer.await.unwrap());
            }

            let tabs: Option<Vec<u32>> = store.get("editor:tabs:v2").await;
            let tabs = tabs.expect("entry lost after concurrent sets");
            assert_eq!(tabs[0], round);
        }

        let leftovers = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_file_backend_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        std::fs::write(backend.item_path("bad"), b"{ not json").unwrap();

        assert!(backend.get_item("bad").await.is_err());
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
