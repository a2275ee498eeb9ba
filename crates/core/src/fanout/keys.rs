//! Mapping from scratch files to destination object keys.

use std::path::{Component, Path};

use super::error::FanOutError;

/// Joins a key prefix and a relative key with exactly one `/` between them.
pub fn join_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Returns `path` relative to `root` as a `/`-separated key.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, FanOutError> {
    let outside = || FanOutError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let relative = path.strip_prefix(root).map_err(|_| outside())?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => return Err(outside()),
        }
    }

    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}

/// Destination key of a scratch file: `prefix` + path relative to `root`.
pub fn destination_key(prefix: &str, root: &Path, path: &Path) -> Result<String, FanOutError> {
    Ok(join_key(prefix, &relative_key(root, path)?))
}
