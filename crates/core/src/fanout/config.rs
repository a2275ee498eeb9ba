//! Configuration for upload fan-out.

use serde::{Deserialize, Serialize};

/// Upload fan-out settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum uploads in flight per job. Unset means unbounded.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

impl UploadConfig {
    /// Bounded fan-out.
    pub fn bounded(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: Some(max_concurrent),
        }
    }
}
