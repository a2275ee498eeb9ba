//! Azure Blob Storage authenticated with a shared account key.

use async_trait::async_trait;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use tracing::debug;

use super::error::SourceError;
use super::object::{get_object, object_path, put_object};
use super::traits::StorageSource;
use super::types::SourceSettings;

/// Provider identifier.
pub const PROVIDER_AZURE: &str = "azure";

/// Key-authenticated blob store.
pub struct AzureSource {
    account_name: String,
    account_key: String,
}

impl AzureSource {
    /// Creates a source from settings; requires account name and key.
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let account_name = settings
            .account_name
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_AZURE, "account_name"))?;
        let account_key = settings
            .account_key
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_AZURE, "account_key"))?;

        Ok(Self {
            account_name,
            account_key,
        })
    }

    /// Returns the account this source is bound to.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    fn container_client(&self, container: &str) -> Result<MicrosoftAzure, SourceError> {
        MicrosoftAzureBuilder::new()
            .with_account(&self.account_name)
            .with_access_key(&self.account_key)
            .with_container_name(container)
            .build()
            .map_err(|e| SourceError::client(PROVIDER_AZURE, e))
    }
}

#[async_trait]
impl StorageSource for AzureSource {
    fn name(&self) -> &str {
        PROVIDER_AZURE
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        _zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        let path = object_path(PROVIDER_AZURE, key)?;
        let client = self.container_client(container)?;
        debug!(account = %self.account_name, container, key, "Downloading blob");
        get_object(&client, PROVIDER_AZURE, container, key, &path).await
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        _zone: Option<&str>,
    ) -> Result<(), SourceError> {
        let path = object_path(PROVIDER_AZURE, key)?;
        let client = self.container_client(container)?;
        debug!(account = %self.account_name, container, key, bytes = data.len(), "Uploading blob");
        put_object(&client, PROVIDER_AZURE, container, key, &path, data).await
    }
}
