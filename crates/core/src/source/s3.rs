//! Region-scoped S3 object store authenticated with a static key pair.

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use tracing::debug;

use super::error::SourceError;
use super::object::{get_object, object_path, put_object};
use super::traits::StorageSource;
use super::types::SourceSettings;

/// Provider identifier.
pub const PROVIDER_S3: &str = "s3";

/// Keyed S3 source. The `zone` argument selects the region per call and
/// falls back to the configured region.
pub struct S3Source {
    access_key_id: String,
    secret_access_key: String,
    default_region: Option<String>,
    endpoint: Option<String>,
}

impl S3Source {
    /// Creates a source from settings; requires the key pair.
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let access_key_id = settings
            .access_key_id
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_S3, "access_key_id"))?;
        let secret_access_key = settings
            .secret_access_key
            .clone()
            .ok_or_else(|| SourceError::missing(PROVIDER_S3, "secret_access_key"))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            default_region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        })
    }

    fn resolve_region<'a>(&'a self, zone: Option<&'a str>) -> Result<&'a str, SourceError> {
        zone.filter(|z| !z.is_empty())
            .or(self.default_region.as_deref())
            .ok_or_else(|| SourceError::missing(PROVIDER_S3, "region"))
    }

    fn bucket_client(&self, bucket: &str, region: &str) -> Result<AmazonS3, SourceError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_access_key_id(&self.access_key_id)
            .with_secret_access_key(&self.secret_access_key);

        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        builder
            .build()
            .map_err(|e| SourceError::client(PROVIDER_S3, e))
    }
}

#[async_trait]
impl StorageSource for S3Source {
    fn name(&self) -> &str {
        PROVIDER_S3
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        let path = object_path(PROVIDER_S3, key)?;
        let region = self.resolve_region(zone)?;
        let client = self.bucket_client(container, region)?;
        debug!(bucket = container, region, key, "Downloading object");
        get_object(&client, PROVIDER_S3, container, key, &path).await
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        zone: Option<&str>,
    ) -> Result<(), SourceError> {
        let path = object_path(PROVIDER_S3, key)?;
        let region = self.resolve_region(zone)?;
        let client = self.bucket_client(container, region)?;
        debug!(bucket = container, region, key, bytes = data.len(), "Uploading object");
        put_object(&client, PROVIDER_S3, container, key, &path, data).await
    }
}
