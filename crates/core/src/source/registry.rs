//! Provider registry mapping identifiers to source constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use super::azure::{AzureSource, PROVIDER_AZURE};
use super::azure_sas::{AzureSasSource, PROVIDER_AZURE_SAS};
use super::error::SourceError;
use super::local::{LocalSource, PROVIDER_LOCAL};
use super::s3::{S3Source, PROVIDER_S3};
use super::traits::StorageSource;
use super::types::SourceSettings;

/// Builds a storage source from settings.
pub type SourceConstructor =
    Arc<dyn Fn(&SourceSettings) -> Result<Arc<dyn StorageSource>, SourceError> + Send + Sync>;

/// Errors returned when resolving a provider.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No constructor is registered under this identifier.
    #[error("storage provider not found: {0}")]
    ProviderNotFound(String),

    /// The constructor rejected the settings.
    #[error("failed to create storage provider {provider}: {source}")]
    Construction {
        provider: String,
        #[source]
        source: SourceError,
    },
}

/// Registry of storage providers.
///
/// Providers are registered once at process start; the orchestrator only
/// ever sees `Arc<dyn StorageSource>`.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    constructors: HashMap<String, SourceConstructor>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in provider.
    pub fn with_builtin_sources() -> Self {
        let mut registry = Self::new();
        registry.register(PROVIDER_AZURE, |settings| {
            Ok(Arc::new(AzureSource::new(settings)?) as Arc<dyn StorageSource>)
        });
        registry.register(PROVIDER_AZURE_SAS, |settings| {
            Ok(Arc::new(AzureSasSource::new(settings)?) as Arc<dyn StorageSource>)
        });
        registry.register(PROVIDER_S3, |settings| {
            Ok(Arc::new(S3Source::new(settings)?) as Arc<dyn StorageSource>)
        });
        registry.register(PROVIDER_LOCAL, |settings| {
            Ok(Arc::new(LocalSource::new(settings)?) as Arc<dyn StorageSource>)
        });
        registry
    }

    /// Registers a constructor under `provider`.
    pub fn register<F>(&mut self, provider: impl Into<String>, constructor: F)
    where
        F: Fn(&SourceSettings) -> Result<Arc<dyn StorageSource>, SourceError>
            + Send
            + Sync
            + 'static,
    {
        let provider = provider.into();
        if self
            .constructors
            .insert(provider.clone(), Arc::new(constructor))
            .is_some()
        {
            warn!(provider = %provider, "Storage provider registered twice, replacing");
        }
    }

    /// Builds the source registered under `provider`.
    pub fn create(
        &self,
        provider: &str,
        settings: &SourceSettings,
    ) -> Result<Arc<dyn StorageSource>, RegistryError> {
        let constructor = self
            .constructors
            .get(provider)
            .ok_or_else(|| RegistryError::ProviderNotFound(provider.to_string()))?;

        constructor(settings).map_err(|source| RegistryError::Construction {
            provider: provider.to_string(),
            source,
        })
    }

    /// Whether a provider is registered.
    pub fn contains(&self, provider: &str) -> bool {
        self.constructors.contains_key(provider)
    }

    /// Registered provider identifiers, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self.constructors.keys().cloned().collect();
        providers.sort();
        providers
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
