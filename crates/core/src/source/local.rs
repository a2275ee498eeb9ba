//! Local filesystem provider, one sub-directory per container.

use async_trait::async_trait;
use object_store::local::LocalFileSystem;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::SourceError;
use super::object::{get_object, object_path, put_object};
use super::traits::StorageSource;
use super::types::SourceSettings;

/// Provider identifier.
pub const PROVIDER_LOCAL: &str = "local";

/// Stores objects under `<root>/<container>/<key>`.
pub struct LocalSource {
    root: PathBuf,
    store: LocalFileSystem,
}

impl LocalSource {
    /// Creates a source rooted at `settings.local_root`, creating it if needed.
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let root = settings
            .local_root
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_LOCAL, "local_root"))?;
        Self::with_root(root)
    }

    /// Creates a source rooted at the given directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| SourceError::LocalRoot {
            provider: PROVIDER_LOCAL.to_string(),
            path: root.clone(),
            source,
        })?;

        let store = LocalFileSystem::new_with_prefix(&root)
            .map_err(|e| SourceError::client(PROVIDER_LOCAL, e))?;

        Ok(Self { root, store })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageSource for LocalSource {
    fn name(&self) -> &str {
        PROVIDER_LOCAL
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        _zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        object_path(PROVIDER_LOCAL, key)?;
        let path = object_path(PROVIDER_LOCAL, &format!("{}/{}", container, key))?;
        debug!(container, key, "Reading local object");
        get_object(&self.store, PROVIDER_LOCAL, container, key, &path).await
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        _zone: Option<&str>,
    ) -> Result<(), SourceError> {
        object_path(PROVIDER_LOCAL, key)?;
        let path = object_path(PROVIDER_LOCAL, &format!("{}/{}", container, key))?;
        debug!(container, key, bytes = data.len(), "Writing local object");
        put_object(&self.store, PROVIDER_LOCAL, container, key, &path, data).await
    }
}
