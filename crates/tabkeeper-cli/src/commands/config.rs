use anyhow::{Context, Result};
use std::path::Path;

use tabkeeper_core::config::EngineConfig;
use tabkeeper_infrastructure::ConfigService;

pub fn show(config: &EngineConfig, explicit_path: Option<&Path>) -> Result<()> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => ConfigService::new().path().map(Path::to_path_buf),
    };
    match path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory available, showing defaults"),
    }

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
