//! Abstract byte storage behind the host
//!
//! The host never interprets what it stores: blobs are opaque ciphertext or
//! signed records, addressed by slash-separated paths. [`FileStore`] is the
//! narrow interface the host consumes; [`ObjectFileStore`] implements it over
//! `object_store` for in-memory and local filesystem backends.

use async_trait::async_trait;
use bytes::Bytes;

mod layout;
mod object;
mod signed;

pub use layout::Layout;
pub use object::{ObjectFileStore, StoreConfig};
pub use signed::SignedRecord;

/// Errors that can occur when working with a file store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The path can't be represented in the store
    #[error("invalid path '{0}': {1}")]
    InvalidPath(String, String),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Byte store keyed by slash-separated paths
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Write `bytes` at `path`, replacing anything already there
    async fn write(&self, path: &str, bytes: Bytes) -> Result<(), StorageError>;

    /// Read the bytes at `path`, `None` if nothing is stored there
    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError>;

    /// Names of the immediate children of `prefix`, empty if it doesn't exist
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove whatever is stored at `path`; removing nothing is not an error
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}
