//! Whole-object helpers over `object_store` clients.

use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

use super::error::SourceError;

/// Parses a provider key into an object path.
pub(crate) fn object_path(provider: &str, key: &str) -> Result<ObjectPath, SourceError> {
    if key.trim_matches('/').is_empty() {
        return Err(SourceError::InvalidKey {
            provider: provider.to_string(),
            key: key.to_string(),
            reason: "key is empty".to_string(),
        });
    }

    ObjectPath::parse(key).map_err(|e| SourceError::InvalidKey {
        provider: provider.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Reads an object into memory.
pub(crate) async fn get_object(
    store: &dyn ObjectStore,
    provider: &str,
    container: &str,
    key: &str,
    path: &ObjectPath,
) -> Result<Vec<u8>, SourceError> {
    let download_error = |source| SourceError::Download {
        provider: provider.to_string(),
        container: container.to_string(),
        key: key.to_string(),
        source,
    };

    let result = store.get(path).await.map_err(download_error)?;
    let bytes = result.bytes().await.map_err(download_error)?;
    Ok(bytes.to_vec())
}

/// Writes an object in a single request.
pub(crate) async fn put_object(
    store: &dyn ObjectStore,
    provider: &str,
    container: &str,
    key: &str,
    path: &ObjectPath,
    data: Vec<u8>,
) -> Result<(), SourceError> {
    store
        .put(path, PutPayload::from(data))
        .await
        .map_err(|source| SourceError::Upload {
            provider: provider.to_string(),
            container: container.to_string(),
            key: key.to_string(),
            source,
        })?;
    Ok(())
}
