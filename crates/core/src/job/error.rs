//! Error types for the job module.

use thiserror::Error;

use crate::fanout::FanOutError;
use crate::source::{RegistryError, SourceError};
use crate::tiler::TilerError;

use super::types::JobState;

/// Errors that end a job.
///
/// The `Display` text of a stage failure becomes the status marker body.
#[derive(Debug, Error)]
pub enum JobError {
    /// The image key cannot be mapped to output keys.
    #[error("invalid image key {key:?}: {reason}")]
    InvalidImageKey { key: String, reason: &'static str },

    /// The provider is unknown or its settings are invalid.
    #[error(transparent)]
    Provider(#[from] RegistryError),

    /// The `pending` marker could not be written.
    #[error("error creating status marker: {0}")]
    StatusUnavailable(#[source] SourceError),

    /// The scratch workspace could not be created.
    #[error("error creating scratch workspace: {0}")]
    Scratch(#[source] std::io::Error),

    /// The source image could not be downloaded.
    #[error("error downloading image: {0}")]
    Download(#[source] SourceError),

    /// The tiling tool failed.
    #[error("error generating tiles: {0}")]
    Generate(#[from] TilerError),

    /// One or more uploads failed.
    #[error("error uploading tiles: {0}")]
    Upload(#[from] FanOutError),
}

impl JobError {
    /// Whether the job was rejected before any side effect.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidImageKey { .. } | Self::Provider(_))
    }

    /// Stage the job was in when this error occurred.
    pub fn stage(&self) -> JobState {
        match self {
            Self::Generate(_) => JobState::Generating,
            Self::Upload(_) => JobState::Uploading,
            _ => JobState::Pending,
        }
    }
}
