//! Per-job scratch directories.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Prefix of every scratch directory name.
pub const SCRATCH_PREFIX: &str = "dzfiles-";

/// Uniquely named directory owned by one job.
///
/// Removed by [`ScratchWorkspace::cleanup`]; if that never runs (early
/// return, panic) or fails, `Drop` removes it synchronously.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    removed: bool,
}

impl ScratchWorkspace {
    /// Creates `<root>/dzfiles-<random>`. Fails rather than reuse an
    /// existing directory.
    pub async fn create(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root).await?;
        let path = root.join(format!("{}{}", SCRATCH_PREFIX, Uuid::new_v4().simple()));
        fs::create_dir(&path).await?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and everything in it.
    pub async fn cleanup(mut self) -> io::Result<()> {
        let result = match fs::remove_dir_all(&self.path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
        self.removed = result.is_ok();
        result
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
