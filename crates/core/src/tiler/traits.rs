//! Trait definitions for the tiler module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TilerError;
use super::types::TileArtifacts;

/// Turns raster bytes into a deep zoom pyramid on local disk.
///
/// The tile tree is opaque to callers: they only upload it verbatim.
#[async_trait]
pub trait TileGenerator: Send + Sync {
    /// Returns the name of this generator implementation.
    fn name(&self) -> &str;

    /// Writes `image` to `scratch_dir/<base_name>.tiff` and produces
    /// `<base_name>.dzi` plus `<base_name>_files/` next to it.
    async fn generate(
        &self,
        scratch_dir: &Path,
        image: &[u8],
        base_name: &str,
    ) -> Result<TileArtifacts, TilerError>;

    /// Validates that the generator is ready to run.
    async fn validate(&self) -> Result<(), TilerError>;
}
