//! Storage sources: whole-object download/upload against one provider.
//!
//! Every backend implements [`StorageSource`] and is reached through the
//! [`SourceRegistry`], so the job runner never names a concrete provider.
//!
//! # Providers
//!
//! - `azure`: blob storage with account name + shared key
//! - `azure_sas`: blob storage with account name + SAS token
//! - `s3`: S3 with a static key pair, region chosen per call
//! - `local`: a directory on disk, one sub-directory per container
//!
//! # Example
//!
//! ```ignore
//! use dzpublish_core::source::{SourceRegistry, SourceSettings};
//!
//! let registry = SourceRegistry::with_builtin_sources();
//! let source = registry.create("s3", &settings)?;
//!
//! let image = source.download("slides", "2024/scan.tiff", Some("eu-west-1")).await?;
//! source.upload(image, "2024/copy.tiff", "slides", Some("eu-west-1")).await?;
//! ```

mod azure;
mod azure_sas;
mod error;
mod local;
mod object;
mod registry;
mod s3;
mod traits;
mod types;

pub use azure::{AzureSource, PROVIDER_AZURE};
pub use azure_sas::{AzureSasSource, PROVIDER_AZURE_SAS};
pub use error::SourceError;
pub use local::{LocalSource, PROVIDER_LOCAL};
pub use registry::{RegistryError, SourceConstructor, SourceRegistry};
pub use s3::{S3Source, PROVIDER_S3};
pub use traits::StorageSource;
pub use types::SourceSettings;
