//! Trait definitions for the source module.

use async_trait::async_trait;

use super::error::SourceError;

/// Whole-object access to one storage provider.
///
/// `container` names the bucket or blob container and `key` is a
/// provider-native path that may contain `/`. `zone` is honoured by
/// region-scoped providers and ignored by the others.
#[async_trait]
pub trait StorageSource: Send + Sync {
    /// Returns the provider identifier of this source.
    fn name(&self) -> &str;

    /// Downloads the full body of an object.
    async fn download(
        &self,
        container: &str,
        key: &str,
        zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError>;

    /// Uploads a whole object, replacing any existing one.
    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        zone: Option<&str>,
    ) -> Result<(), SourceError>;
}
