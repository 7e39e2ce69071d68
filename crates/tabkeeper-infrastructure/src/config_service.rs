//! Configuration service implementation.
//!
//! Loads the engine configuration from `~/.config/tabkeeper/config.toml`.
//! A missing file yields the defaults; a file that exists but does not parse is
//! an error, so a typo never silently reverts the user's settings.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tabkeeper_core::config::EngineConfig;
use tabkeeper_core::error::{Result, TabkeeperError};

use crate::paths::TabkeeperPaths;

/// Loads and caches the engine configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<EngineConfig>>>,
}

impl ConfigService {
    /// Uses the default config file location.
    pub fn new() -> Self {
        Self {
            path: TabkeeperPaths::config_file().ok(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<EngineConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| TabkeeperError::internal("config cache poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut write_lock = self
            .config
            .write()
            .map_err(|_| TabkeeperError::internal("config cache poisoned"))?;
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load_config(&self) -> Result<EngineConfig> {
        let Some(path) = &self.path else {
            tracing::warn!("No config directory available, using defaults");
            return Ok(EngineConfig::default());
        };

        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TabkeeperError::io(format!("Failed to read config file at {:?}: {}", path, e)))?;

        if content.trim().is_empty() {
            return Ok(EngineConfig::default());
        }

        toml::from_str(&content)
            .map_err(|e| TabkeeperError::config(format!("Failed to parse {:?}: {}", path, e)))
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let service = ConfigService::with_path("/nonexistent/tabkeeper/config.toml");
        assert_eq!(service.get_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_loads_and_caches() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "resource_sample_interval_ms = 500\nevent_capacity = 32").unwrap();

        let service = ConfigService::with_path(file.path());
        let config = service.get_config().unwrap();
        assert_eq!(config.resource_sample_interval_ms, 500);
        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.sleep_sweep_interval_ms, 60_000);

        // Cached value wins until invalidated.
        std::fs::write(file.path(), "event_capacity = 8").unwrap();
        assert_eq!(service.get_config().unwrap().event_capacity, 32);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().event_capacity, 8);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "event_capacity = \"lots\"").unwrap();

        let err = ConfigService::with_path(file.path()).get_config().unwrap_err();
        assert!(matches!(err, TabkeeperError::Config(_)));
    }
}
