//! Tile generation via an external deep zoom tool.
//!
//! The generator writes the source raster into the job's scratch directory,
//! runs `vips dzsave`, and reports where the index and tile tree landed.
//! Nothing here looks inside the tile tree.

mod config;
mod error;
mod traits;
mod types;
mod vips;

pub use config::TilerConfig;
pub use error::TilerError;
pub use traits::TileGenerator;
pub use types::{
    output_prefix, source_path, TileArtifacts, INDEX_EXTENSION, SOURCE_EXTENSION,
    TILES_DIR_SUFFIX,
};
pub use vips::VipsTileGenerator;
