//! Download helpers used by the REST transfer routes.

use super::{ObjectStore, StorageError};
use std::path::{Component, Path, PathBuf};

/// Download one object to `destination`, creating parent directories as needed.
///
/// Returns the number of bytes written.
pub async fn download_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    destination: &Path,
) -> Result<u64, StorageError> {
    let body = store.get(bucket, key).await?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(destination, &body).await?;
    tracing::info!(
        bucket,
        key,
        destination = %destination.display(),
        bytes = body.len(),
        "Object downloaded"
    );
    Ok(body.len() as u64)
}

/// Download every object under `prefix` into `folder`, mirroring the key layout below the prefix.
///
/// Folder marker keys (ending in `/`) are skipped. Returns the number of files written.
pub async fn download_prefix(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    folder: &Path,
) -> Result<usize, StorageError> {
    let objects = store.list(bucket, prefix).await?;
    tokio::fs::create_dir_all(folder).await?;

    let mut written = 0;
    for object in objects {
        if object.key.ends_with('/') {
            continue;
        }
        let relative = relative_destination(prefix, &object.key)?;
        let destination = folder.join(relative);
        tracing::debug!(key = %object.key, destination = %destination.display(), "Downloading file");
        download_object(store, bucket, &object.key, &destination).await?;
        written += 1;
    }

    tracing::info!(bucket, prefix, files = written, "Folder downloaded");
    Ok(written)
}

fn relative_destination(prefix: &str, key: &str) -> Result<PathBuf, StorageError> {
    let relative = key
        .strip_prefix(prefix)
        .unwrap_or(key)
        .trim_start_matches('/');
    if relative.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let path = Path::new(relative);
    if !path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(path.to_path_buf())
}
