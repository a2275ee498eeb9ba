//! Azure Blob Storage authenticated with a SAS token.

use async_trait::async_trait;
use object_store::azure::{AzureConfigKey, MicrosoftAzure, MicrosoftAzureBuilder};
use tracing::debug;

use super::error::SourceError;
use super::object::{get_object, object_path, put_object};
use super::traits::StorageSource;
use super::types::SourceSettings;

/// Provider identifier.
pub const PROVIDER_AZURE_SAS: &str = "azure_sas";

/// SAS-token-authenticated blob store.
///
/// The token and account may come from configuration or from the trigger
/// payload; by the time the source is built they are plain settings.
pub struct AzureSasSource {
    account_name: String,
    sas_token: String,
}

impl AzureSasSource {
    /// Creates a source from settings; requires account name and SAS token.
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let account_name = settings
            .account_name
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_AZURE_SAS, "account_name"))?;
        let sas_token = settings
            .sas_token
            .as_deref()
            .map(|token| token.trim_start_matches('?').to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SourceError::missing(PROVIDER_AZURE_SAS, "sas_token"))?;

        Ok(Self {
            account_name,
            sas_token,
        })
    }

    fn container_client(&self, container: &str) -> Result<MicrosoftAzure, SourceError> {
        MicrosoftAzureBuilder::new()
            .with_account(&self.account_name)
            .with_container_name(container)
            .with_config(AzureConfigKey::SasKey, &self.sas_token)
            .build()
            .map_err(|e| SourceError::client(PROVIDER_AZURE_SAS, e))
    }
}

#[async_trait]
impl StorageSource for AzureSasSource {
    fn name(&self) -> &str {
        PROVIDER_AZURE_SAS
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        _zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        let path = object_path(PROVIDER_AZURE_SAS, key)?;
        let client = self.container_client(container)?;
        debug!(account = %self.account_name, container, key, "Downloading blob with SAS");
        get_object(&client, PROVIDER_AZURE_SAS, container, key, &path).await
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        _zone: Option<&str>,
    ) -> Result<(), SourceError> {
        let path = object_path(PROVIDER_AZURE_SAS, key)?;
        let client = self.container_client(container)?;
        debug!(account = %self.account_name, container, key, bytes = data.len(), "Uploading blob with SAS");
        put_object(&client, PROVIDER_AZURE_SAS, container, key, &path, data).await
    }
}
