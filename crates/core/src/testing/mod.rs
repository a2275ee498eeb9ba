//! Testing utilities and mock implementations.
//!
//! Mocks stand in for object storage and the tiling tool, so the job
//! runner and the HTTP layer can be exercised without cloud accounts or a
//! `vips` install.
//!
//! # Example
//!
//! ```rust,ignore
//! use dzpublish_core::testing::{MockSource, MockTileGenerator};
//!
//! let source = MockSource::new();
//! source.put_object("raw", "scans/slide.tiff", b"raster".to_vec()).await;
//!
//! let tiler = MockTileGenerator::new();
//! tiler.set_levels(vec![(0, 1), (1, 4)]).await;
//!
//! // Register the source under "mock" and hand both to a JobRunner...
//! ```

mod mock_source;
mod mock_tiler;

pub use mock_source::{MockSource, RecordedDownload, RecordedUpload, MOCK_PROVIDER};
pub use mock_tiler::{MockTileGenerator, RecordedGenerate};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io;
    use std::path::Path;

    /// Writes `<base>.dzi` and a `<base>_files/` tree into `root`.
    ///
    /// Each `(level, count)` pair produces `count` tiles named
    /// `<base>_files/<level>/<i>_0.jpeg` whose body is `tile <relative path>`.
    /// Returns the tile paths relative to `root`, in level order.
    pub fn try_write_pyramid(
        root: &Path,
        base: &str,
        levels: &[(u32, usize)],
    ) -> io::Result<Vec<String>> {
        let tiles_dir = format!("{}_files", base);
        std::fs::create_dir_all(root.join(&tiles_dir))?;
        std::fs::write(
            root.join(format!("{}.dzi", base)),
            dzi_document(levels.len()),
        )?;

        let mut written = Vec::new();
        for &(level, count) in levels {
            let level_dir = format!("{}/{}", tiles_dir, level);
            std::fs::create_dir_all(root.join(&level_dir))?;
            for i in 0..count {
                let relative = format!("{}/{}_0.jpeg", level_dir, i);
                std::fs::write(root.join(&relative), format!("tile {}", relative))?;
                written.push(relative);
            }
        }
        Ok(written)
    }

    /// Panicking variant of [`try_write_pyramid`] for tests.
    pub fn write_pyramid(root: &Path, base: &str, levels: &[(u32, usize)]) -> Vec<String> {
        try_write_pyramid(root, base, levels).expect("failed to write pyramid fixture")
    }

    /// Minimal deep zoom index body.
    pub fn dzi_document(levels: usize) -> String {
        let side = 1usize << levels.min(16);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Image xmlns="http://schemas.microsoft.com/deepzoom/2008" Format="jpeg" Overlap="1" TileSize="254"><Size Width="{side}" Height="{side}"/></Image>"#
        )
    }
}
