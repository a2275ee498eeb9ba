//! Error types for the fan-out module.

use std::path::PathBuf;
use thiserror::Error;

use crate::source::SourceError;

/// Errors raised by a single upload task.
#[derive(Debug, Error)]
pub enum UploadTaskError {
    /// The generated file could not be read.
    #[error("error reading file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage source rejected the upload.
    #[error("error uploading file {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
}

/// Aggregate failure of an upload fan-out.
#[derive(Debug, Error)]
pub enum FanOutError {
    /// The tile tree could not be traversed. Scheduled tasks were drained.
    #[error("error walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file lies outside the scratch root and has no destination key.
    #[error("file {path} is outside scratch root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// One or more uploads failed; `source` is the first one observed.
    #[error("{failed} of {scheduled} uploads failed, first: {source}")]
    Upload {
        failed: usize,
        scheduled: usize,
        #[source]
        source: UploadTaskError,
    },

    /// An upload task panicked.
    #[error("{failed} of {scheduled} upload tasks failed, first panicked: {message}")]
    TaskPanicked {
        failed: usize,
        scheduled: usize,
        message: String,
    },
}

impl FanOutError {
    /// Number of failed tasks, zero for traversal errors.
    pub fn failed_count(&self) -> usize {
        match self {
            Self::Upload { failed, .. } | Self::TaskPanicked { failed, .. } => *failed,
            Self::Walk { .. } | Self::OutsideRoot { .. } => 0,
        }
    }
}
