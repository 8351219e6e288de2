use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use super::{FileStore, StorageError};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },
}

/// [`FileStore`] over any `object_store` backend
#[derive(Debug, Clone)]
pub struct ObjectFileStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectFileStore {
    /// Create a new storage backend from configuration.
    pub async fn new(config: StoreConfig) -> Result<Self, StorageError> {
        let inner: Arc<dyn ObjectStore> = match &config {
            StoreConfig::Memory => Arc::new(InMemory::new()),

            StoreConfig::Local { path } => {
                // Ensure directory exists
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| StorageError::InvalidConfig(e.to_string()))?,
                )
            }
        };

        tracing::debug!(?config, "opened file store");
        Ok(Self { inner })
    }

    /// Create an in-memory storage backend.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Parse a protocol path into an object path.
    ///
    /// Rejects empty segments, `.`/`..` and anything else `object_store`
    /// refuses, so a caller-supplied location can never escape the store.
    fn object_path(path: &str) -> Result<ObjectPath, StorageError> {
        if path.is_empty() {
            return Err(StorageError::InvalidPath(path.into(), "empty path".into()));
        }
        ObjectPath::parse(path).map_err(|e| StorageError::InvalidPath(path.into(), e.to_string()))
    }

    fn prefix_path(prefix: &str) -> Result<ObjectPath, StorageError> {
        if prefix.is_empty() {
            return Ok(ObjectPath::default());
        }
        Self::object_path(prefix.trim_end_matches('/'))
    }
}

#[async_trait]
impl FileStore for ObjectFileStore {
    async fn write(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
        let location = Self::object_path(path)?;
        self.inner.put(&location, bytes.into()).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError> {
        let location = Self::object_path(path)?;
        match self.inner.get(&location).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(bytes))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = Self::prefix_path(prefix)?;
        let listing = match self.inner.list_with_delimiter(Some(&prefix)).await {
            Ok(listing) => listing,
            Err(object_store::Error::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = listing
            .common_prefixes
            .iter()
            .chain(listing.objects.iter().map(|meta| &meta.location))
            .filter_map(|path| path.filename().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let location = Self::object_path(path)?;
        // Ignore NotFound errors - the blob may already be deleted
        match self.inner.delete(&location).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn exercise(store: &ObjectFileStore) {
        store
            .write("users/a/posts/one", Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .write("users/a/posts/two", Bytes::from_static(b"second"))
            .await
            .unwrap();
        store
            .write("users/a/index.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(
            store.read("users/a/posts/one").await.unwrap().unwrap(),
            Bytes::from_static(b"first")
        );
        assert!(store.read("users/a/posts/three").await.unwrap().is_none());

        assert_eq!(
            store.list("users/a/posts").await.unwrap(),
            vec!["one".to_string(), "two".to_string()]
        );
        assert_eq!(
            store.list("users/a/").await.unwrap(),
            vec!["index.json".to_string(), "posts".to_string()]
        );
        assert!(store.list("users/nobody/reqs").await.unwrap().is_empty());

        store.delete("users/a/posts/one").await.unwrap();
        assert!(store.read("users/a/posts/one").await.unwrap().is_none());
        // deleting twice is fine
        store.delete("users/a/posts/one").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = ObjectFileStore::new(StoreConfig::Memory).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectFileStore::new(StoreConfig::Local {
            path: dir.path().join("store"),
        })
        .await
        .unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let store = ObjectFileStore::memory();
        store.write("a/b", Bytes::from_static(b"x")).await.unwrap();
        store.write("a/b", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(store.list("a").await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_paths() {
        let store = ObjectFileStore::memory();
        for path in ["", "users//posts", "users/../etc", "users/./x"] {
            let result = store.write(path, Bytes::from_static(b"x")).await;
            assert!(
                matches!(result, Err(StorageError::InvalidPath(_, _))),
                "accepted {:?}",
                path
            );
        }
    }

    #[test]
    fn test_config_serde() {
        let config: StoreConfig = from_json(r#"{"type":"local","path":"/tmp/veil"}"#);
        assert_eq!(
            config,
            StoreConfig::Local {
                path: PathBuf::from("/tmp/veil")
            }
        );
        let config: StoreConfig = from_json(r#"{"type":"memory"}"#);
        assert_eq!(config, StoreConfig::Memory);
    }

    fn from_json(json: &str) -> StoreConfig {
        serde_json::from_str(json).unwrap()
    }
}
