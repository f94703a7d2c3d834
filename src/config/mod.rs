//! Configuration management
//!
//! Handles connection targets, user settings and the config directory.

pub mod connections;
pub mod settings;

pub use connections::{ConnectionConfig, SslMode};
pub use settings::{Settings, load_settings};

use crate::error::ConfigResult;
use std::path::{Path, PathBuf};

/// Resolve the config directory (explicit override or `~/.pgnav`) and create it.
pub fn ensure_config_dir(override_dir: Option<&Path>) -> ConfigResult<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => ConnectionConfig::config_dir()?,
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_config_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b");
        let dir = ensure_config_dir(Some(&target)).unwrap();
        assert!(dir.is_dir());
    }
}
