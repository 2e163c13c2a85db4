//! In-memory object store.
//!
//! Keeps buckets in ordered maps so listings come back in lexicographic key order, the same
//! order S3 uses. Handy for tests and for running the pipeline without cloud access.

use super::{ObjectRef, ObjectStore, StorageError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Object store backed by process memory.
#[derive(Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with objects in a single bucket.
    pub fn with_objects<I, K, V>(bucket: &str, objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let contents = objects
            .into_iter()
            .map(|(key, body)| (key.into(), body.into()))
            .collect();
        let mut buckets = HashMap::new();
        buckets.insert(bucket.to_string(), contents);
        Self {
            buckets: RwLock::new(buckets),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>, StorageError> {
        let buckets = self.buckets.read().await;
        let objects: Vec<ObjectRef> = buckets
            .get(bucket)
            .map(|contents| {
                contents
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .map(|key| ObjectRef::from_key(key))
                    .collect()
            })
            .unwrap_or_default();

        if objects.is_empty() {
            return Err(StorageError::NotFound {
                prefix: prefix.to_string(),
            });
        }
        Ok(objects)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|contents| contents.get(key))
            .cloned()
            .ok_or_else(|| StorageError::Transport(format!("no such key s3://{bucket}/{key}")))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }
}
