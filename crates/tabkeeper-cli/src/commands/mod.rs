pub mod config;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;

use tabkeeper_core::config::EngineConfig;
use tabkeeper_infrastructure::{ConfigService, FileStore};

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let service = match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    service.get_config().context("Failed to load configuration")
}

/// Opens the file store at the configured data directory.
pub fn open_store(config: &EngineConfig) -> Result<FileStore> {
    match &config.data_dir {
        Some(dir) => Ok(FileStore::new(dir)),
        None => FileStore::new_default().context("Failed to resolve the data directory"),
    }
}
