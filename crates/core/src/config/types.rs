use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::fanout::UploadConfig;
use crate::source::SourceSettings;
use crate::tiler::TilerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tiler: TilerConfig,
    #[serde(default)]
    pub scratch: ScratchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Storage provider credentials and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Region used by region-scoped providers when a job names no zone
    #[serde(default)]
    pub default_region: Option<String>,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub local: LocalConfig,
}

/// Azure blob storage credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_key: Option<String>,
    /// SAS token used by the `azure_sas` provider when a job carries none
    #[serde(default)]
    pub sas_token: Option<String>,
}

/// S3 credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Config {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Overrides `storage.default_region` for S3
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint (MinIO, Ceph, ...)
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Local filesystem provider
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocalConfig {
    /// Directory holding one sub-directory per container
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Scratch space configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScratchConfig {
    /// Directory under which per-job scratch directories are created
    #[serde(default = "default_scratch_root")]
    pub root: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: default_scratch_root(),
        }
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("dzpublish")
}

impl StorageConfig {
    /// Flattens provider sections into the settings every job starts from.
    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            account_name: self.azure.account_name.clone(),
            account_key: self.azure.account_key.clone(),
            sas_token: self.azure.sas_token.clone(),
            access_key_id: self.s3.access_key_id.clone(),
            secret_access_key: self.s3.secret_access_key.clone(),
            region: self.s3.region.clone().or_else(|| self.default_region.clone()),
            endpoint: self.s3.endpoint.clone(),
            local_root: self.local.root.clone(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: SanitizedStorageConfig,
    pub tiler: TilerConfig,
    pub scratch: ScratchConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
    pub azure: SanitizedAzureConfig,
    pub s3: SanitizedS3Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,
}

/// Sanitized Azure config (keys hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAzureConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    pub account_key_configured: bool,
    pub sas_token_configured: bool,
}

/// Sanitized S3 config (key pair hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedS3Config {
    pub credentials_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let storage = &config.storage;
        Self {
            server: config.server.clone(),
            storage: SanitizedStorageConfig {
                default_region: storage.default_region.clone(),
                azure: SanitizedAzureConfig {
                    account_name: storage.azure.account_name.clone(),
                    account_key_configured: is_set(&storage.azure.account_key),
                    sas_token_configured: is_set(&storage.azure.sas_token),
                },
                s3: SanitizedS3Config {
                    credentials_configured: is_set(&storage.s3.access_key_id)
                        && is_set(&storage.s3.secret_access_key),
                    region: storage.s3.region.clone(),
                    endpoint: storage.s3.endpoint.clone(),
                },
                local_root: storage.local.root.clone(),
            },
            tiler: config.tiler.clone(),
            scratch: config.scratch.clone(),
            upload: config.upload.clone(),
        }
    }
}
