use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload bound, when set, is not 0
/// - Tiler timeout is not 0
/// - Scratch root is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upload.max_concurrent == Some(0) {
        return Err(ConfigError::ValidationError(
            "upload.max_concurrent cannot be 0 (omit it for unbounded uploads)".to_string(),
        ));
    }

    if config.tiler.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tiler.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.scratch.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "scratch.root cannot be empty".to_string(),
        ));
    }

    Ok(())
}
