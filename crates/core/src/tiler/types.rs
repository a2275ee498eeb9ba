//! Types for the tiler module.

use std::path::{Path, PathBuf};

/// Extension of the raster written to scratch space.
pub const SOURCE_EXTENSION: &str = "tiff";

/// Extension of the deep zoom index.
pub const INDEX_EXTENSION: &str = "dzi";

/// Suffix of the tile directory next to the index.
pub const TILES_DIR_SUFFIX: &str = "_files";

/// Local layout of one generated pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileArtifacts {
    /// `<scratch>/<base>.dzi`
    pub index_path: PathBuf,
    /// `<scratch>/<base>_files/`
    pub tiles_dir: PathBuf,
}

impl TileArtifacts {
    /// Expected artifact locations for `base_name` inside `scratch_dir`.
    pub fn expected(scratch_dir: &Path, base_name: &str) -> Self {
        Self {
            index_path: scratch_dir.join(format!("{}.{}", base_name, INDEX_EXTENSION)),
            tiles_dir: scratch_dir.join(format!("{}{}", base_name, TILES_DIR_SUFFIX)),
        }
    }
}

/// Path of the raster input for `base_name` inside `scratch_dir`.
pub fn source_path(scratch_dir: &Path, base_name: &str) -> PathBuf {
    scratch_dir.join(format!("{}.{}", base_name, SOURCE_EXTENSION))
}

/// Output prefix handed to the tiling tool.
pub fn output_prefix(scratch_dir: &Path, base_name: &str) -> PathBuf {
    scratch_dir.join(base_name)
}
