//! Error types for the source module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a storage source.
///
/// The orchestrator only cares about success vs failure, so every provider
/// failure collapses into this one type with the native error attached.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A credential or setting required by the provider is absent.
    #[error("{provider}: missing setting `{field}`")]
    MissingSetting {
        provider: String,
        field: &'static str,
    },

    /// The provider client could not be built.
    #[error("{provider}: failed to build client: {source}")]
    Client {
        provider: String,
        #[source]
        source: object_store::Error,
    },

    /// The object key is not a valid provider path.
    #[error("{provider}: invalid object key {key:?}: {reason}")]
    InvalidKey {
        provider: String,
        key: String,
        reason: String,
    },

    /// Downloading an object failed.
    #[error("{provider}: error downloading {container}/{key}: {source}")]
    Download {
        provider: String,
        container: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// Uploading an object failed.
    #[error("{provider}: error uploading {container}/{key}: {source}")]
    Upload {
        provider: String,
        container: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// The local root directory could not be prepared.
    #[error("{provider}: cannot prepare root {path}: {source}")]
    LocalRoot {
        provider: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Creates a missing setting error.
    pub fn missing(provider: impl Into<String>, field: &'static str) -> Self {
        Self::MissingSetting {
            provider: provider.into(),
            field,
        }
    }

    /// Creates a client construction error.
    pub fn client(provider: impl Into<String>, source: object_store::Error) -> Self {
        Self::Client {
            provider: provider.into(),
            source,
        }
    }

    /// Whether the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Download {
                source: object_store::Error::NotFound { .. },
                ..
            }
        )
    }
}
