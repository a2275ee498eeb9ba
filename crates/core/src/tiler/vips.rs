//! `vips dzsave` based tile generator.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::config::TilerConfig;
use super::error::TilerError;
use super::traits::TileGenerator;
use super::types::{output_prefix, source_path, TileArtifacts};

/// Tile generator that shells out to libvips.
pub struct VipsTileGenerator {
    config: TilerConfig,
}

impl VipsTileGenerator {
    /// Creates a new generator with the given configuration.
    pub fn new(config: TilerConfig) -> Self {
        Self { config }
    }

    /// Creates a generator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TilerConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TilerConfig {
        &self.config
    }

    /// Builds the dzsave arguments.
    fn build_args(&self, input: &Path, prefix: &Path) -> Vec<String> {
        let mut args = vec![
            "dzsave".to_string(),
            input.to_string_lossy().to_string(),
            prefix.to_string_lossy().to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn spawn_error(&self, source: std::io::Error) -> TilerError {
        TilerError::Spawn {
            program: self.config.vips_path.clone(),
            source,
        }
    }
}

fn check_base_name(base_name: &str) -> Result<(), TilerError> {
    if base_name.is_empty()
        || base_name == "."
        || base_name == ".."
        || base_name.contains(['/', '\\'])
    {
        return Err(TilerError::InvalidName(base_name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl TileGenerator for VipsTileGenerator {
    fn name(&self) -> &str {
        "vips"
    }

    async fn generate(
        &self,
        scratch_dir: &Path,
        image: &[u8],
        base_name: &str,
    ) -> Result<TileArtifacts, TilerError> {
        check_base_name(base_name)?;
        let start = Instant::now();

        let input = source_path(scratch_dir, base_name);
        tokio::fs::write(&input, image)
            .await
            .map_err(|source| TilerError::WriteInput {
                path: input.clone(),
                source,
            })?;

        let prefix = output_prefix(scratch_dir, base_name);
        let args = self.build_args(&input, &prefix);
        debug!(program = ?self.config.vips_path, ?args, "Running tiler");

        // Dropping the future on timeout kills the child.
        let run = Command::new(&self.config.vips_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(Duration::from_secs(self.config.timeout_secs), run).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            Err(_) => {
                return Err(TilerError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            return Err(TilerError::process_failed(
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        let artifacts = TileArtifacts::expected(scratch_dir, base_name);
        for path in [&artifacts.index_path, &artifacts.tiles_dir] {
            if tokio::fs::metadata(path).await.is_err() {
                return Err(TilerError::OutputMissing { path: path.clone() });
            }
        }

        info!(
            base_name,
            input_bytes = image.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tiles generated"
        );

        Ok(artifacts)
    }

    async fn validate(&self) -> Result<(), TilerError> {
        let output = Command::new(&self.config.vips_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(TilerError::process_failed(
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "vips available"
        );
        Ok(())
    }
}
