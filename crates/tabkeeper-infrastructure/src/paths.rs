//! Unified path management for tabkeeper files.
//!
//! ```text
//! ~/.config/tabkeeper/         # Config directory
//! └── config.toml              # Engine configuration
//!
//! ~/.local/share/tabkeeper/    # Data directory
//! └── store/                   # One JSON file per partition
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "tabkeeper";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct TabkeeperPaths;

impl TabkeeperPaths {
    /// Returns the tabkeeper configuration directory (e.g. `~/.config/tabkeeper/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the tabkeeper data directory (e.g. `~/.local/share/tabkeeper/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn store_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("store"))
    }
}
