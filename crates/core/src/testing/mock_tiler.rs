//! Mock tile generator for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::tiler::{source_path, TileArtifacts, TileGenerator, TilerError};

use super::fixtures::try_write_pyramid;

/// A recorded `generate` call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedGenerate {
    pub scratch_dir: PathBuf,
    pub base_name: String,
    pub image_len: usize,
}

/// Mock implementation of [`TileGenerator`].
///
/// Writes the input raster and a small fake pyramid into the scratch
/// directory, the same layout `vips dzsave` produces.
#[derive(Debug, Clone)]
pub struct MockTileGenerator {
    levels: Arc<RwLock<Vec<(u32, usize)>>>,
    calls: Arc<RwLock<Vec<RecordedGenerate>>>,
    next_error: Arc<RwLock<Option<TilerError>>>,
    delay: Arc<RwLock<Duration>>,
    available: Arc<RwLock<bool>>,
}

impl Default for MockTileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTileGenerator {
    /// Create a generator producing three levels (1, 1 and 4 tiles).
    pub fn new() -> Self {
        Self {
            levels: Arc::new(RwLock::new(vec![(0, 1), (1, 1), (2, 4)])),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            available: Arc::new(RwLock::new(true)),
        }
    }

    /// Set the `(level, tile count)` layout of generated pyramids.
    pub async fn set_levels(&self, levels: Vec<(u32, usize)>) {
        *self.levels.write().await = levels;
    }

    /// Number of files (index included) one pyramid contains.
    pub async fn files_per_pyramid(&self) -> usize {
        1 + self.levels.read().await.iter().map(|(_, n)| n).sum::<usize>()
    }

    /// Fail the next `generate` call with the given error.
    pub async fn set_next_error(&self, error: TilerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay applied before generating.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Control what `validate` reports.
    pub async fn set_available(&self, available: bool) {
        *self.available.write().await = available;
    }

    /// Every `generate` call, in order.
    pub async fn recorded_calls(&self) -> Vec<RecordedGenerate> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl TileGenerator for MockTileGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        scratch_dir: &Path,
        image: &[u8],
        base_name: &str,
    ) -> Result<TileArtifacts, TilerError> {
        self.calls.write().await.push(RecordedGenerate {
            scratch_dir: scratch_dir.to_path_buf(),
            base_name: base_name.to_string(),
            image_len: image.len(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let input = source_path(scratch_dir, base_name);
        tokio::fs::write(&input, image)
            .await
            .map_err(|source| TilerError::WriteInput {
                path: input.clone(),
                source,
            })?;

        let levels = self.levels.read().await.clone();
        try_write_pyramid(scratch_dir, base_name, &levels).map_err(|source| {
            TilerError::WriteInput {
                path: scratch_dir.to_path_buf(),
                source,
            }
        })?;

        Ok(TileArtifacts::expected(scratch_dir, base_name))
    }

    async fn validate(&self) -> Result<(), TilerError> {
        if *self.available.read().await {
            Ok(())
        } else {
            Err(TilerError::Spawn {
                program: PathBuf::from("mock"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock tiler disabled"),
            })
        }
    }
}
