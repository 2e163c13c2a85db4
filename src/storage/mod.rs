//! Object storage contract consumed by the pipeline and the transfer routes.

pub mod memory;
pub mod transfer;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use memory::InMemoryObjectStore;

/// Errors raised by object storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The prefix matched zero objects.
    #[error("No files found under prefix '{prefix}'")]
    NotFound {
        /// Prefix that was listed.
        prefix: String,
    },
    /// Transport, permission or service failure.
    #[error("Storage request failed: {0}")]
    Transport(String),
    /// Key cannot be mapped to a safe local path.
    #[error("Object key '{0}' cannot be written locally")]
    InvalidKey(String),
    /// Local filesystem failure while writing a download.
    #[error("Local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A listed object and its lower-cased extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    /// Full object key.
    pub key: String,
    /// Lower-cased suffix after the last `.` of the final path segment.
    pub extension: Option<String>,
}

impl ObjectRef {
    /// Derive an object reference from a listed key.
    pub fn from_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            extension: extension_of(key),
        }
    }
}

fn extension_of(key: &str) -> Option<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Interface implemented by object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under `prefix`, in backend listing order.
    ///
    /// Fails with [`StorageError::NotFound`] when nothing matches.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>, StorageError>;

    /// Fetch the full contents of one object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError>;
}
