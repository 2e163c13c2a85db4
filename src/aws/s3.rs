//! S3 implementation of [`ObjectStore`].

use crate::storage::{ObjectRef, ObjectStore, StorageError};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};

/// Object store backed by Amazon S3.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from shared SDK configuration.
    ///
    /// Path-style addressing is needed by most S3 emulators behind a custom endpoint.
    pub fn new(sdk: &SdkConfig, force_path_style: bool) -> Self {
        let config = aws_sdk_s3::config::Builder::from(sdk)
            .force_path_style(force_path_style)
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|error| {
                    StorageError::Transport(format!(
                        "failed to list s3://{bucket}/{prefix}: {}",
                        DisplayErrorContext(&error)
                    ))
                })?;

            objects.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(ObjectRef::from_key),
            );

            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        tracing::debug!(bucket, prefix, objects = objects.len(), "Listed objects");
        if objects.is_empty() {
            return Err(StorageError::NotFound {
                prefix: prefix.to_string(),
            });
        }
        Ok(objects)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                StorageError::Transport(format!(
                    "failed to fetch s3://{bucket}/{key}: {}",
                    DisplayErrorContext(&error)
                ))
            })?;

        let body = output.body.collect().await.map_err(|error| {
            StorageError::Transport(format!("failed to read s3://{bucket}/{key}: {error}"))
        })?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|error| {
                StorageError::Transport(format!(
                    "failed to upload s3://{bucket}/{key}: {}",
                    DisplayErrorContext(&error)
                ))
            })?;
        tracing::info!(bucket, key, bytes = size, "Object uploaded");
        Ok(())
    }
}
