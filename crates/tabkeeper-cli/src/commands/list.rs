use anyhow::{Context, Result, bail};

use tabkeeper_core::config::EngineConfig;
use tabkeeper_core::store::{Partition, Store};

use super::open_store;

pub async fn list(config: &EngineConfig, partition: &str) -> Result<()> {
    let Some(partition) = Partition::parse(partition) else {
        let known: Vec<_> = Partition::ALL.iter().map(|p| p.as_str()).collect();
        bail!("Unknown partition '{}' (expected one of: {})", partition, known.join(", "));
    };

    let store = open_store(config)?;
    store.init().await.context("Failed to open the store")?;
    let records = store
        .get_all(partition)
        .await
        .with_context(|| format!("Failed to read partition '{}'", partition))?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
