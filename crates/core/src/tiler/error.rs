//! Error types for the tiler module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating tiles.
#[derive(Debug, Error)]
pub enum TilerError {
    /// The tiling tool could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source raster could not be written to scratch space.
    #[error("error saving source image to {path}: {source}")]
    WriteInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tiling tool exited unsuccessfully.
    #[error("tiling failed ({status}){}", stderr_suffix(.stderr))]
    ProcessFailed { status: String, stderr: String },

    /// The tiling tool exceeded its time budget.
    #[error("tiling timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The tool succeeded but an expected output is missing.
    #[error("expected tiling output missing: {path}")]
    OutputMissing { path: PathBuf },

    /// Base name cannot be used as a file name.
    #[error("invalid image name {0:?}")]
    InvalidName(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl TilerError {
    /// Creates a process failure from an exit status and captured stderr.
    pub fn process_failed(status: impl ToString, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            status: status.to_string(),
            stderr: stderr.into(),
        }
    }
}
