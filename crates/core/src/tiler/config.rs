//! Configuration for the tile generator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the vips-based tile generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilerConfig {
    /// Path to the vips binary.
    #[serde(default = "default_vips_path")]
    pub vips_path: PathBuf,

    /// Timeout for a single tiling run in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional arguments appended to `vips dzsave`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_vips_path() -> PathBuf {
    PathBuf::from("vips")
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            vips_path: default_vips_path(),
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl TilerConfig {
    /// Creates a config with a custom vips binary.
    pub fn with_vips_path(vips_path: PathBuf) -> Self {
        Self {
            vips_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets extra dzsave arguments.
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }
}
