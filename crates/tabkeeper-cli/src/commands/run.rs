use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use tabkeeper_application::Engine;
use tabkeeper_core::clock::SystemClock;
use tabkeeper_core::config::EngineConfig;
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::resource::ResourceStats;
use tabkeeper_core::store::Store;
use tabkeeper_infrastructure::{MemoryStore, SimulatedHost};

use super::open_store;

const DEMO_TABS: [&str; 3] = ["demo-1", "demo-2", "demo-3"];

pub async fn run(config: EngineConfig, seconds: u64, json: bool, ephemeral: bool) -> Result<()> {
    let store: Arc<dyn Store> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(open_store(&config)?)
    };

    let engine = Engine::init(store, Arc::new(SimulatedHost::new()), Arc::new(SystemClock), config)
        .await
        .context("Failed to initialize engine")?;
    let mut events = engine.subscribe();
    let mut stats = engine.resource_stats();

    // The simulated host has no real tabs; register a few so sampling has data.
    for tab_id in DEMO_TABS {
        engine.sleeping().record_activity(tab_id).await;
    }

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => print_event(&event, json)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "cli", "Dropped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            changed = stats.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = stats.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    print_stats(&snapshot, json)?;
                }
            }
        }
    }

    engine.destroy().await;
    Ok(())
}

fn print_event(event: &EngineEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("event  {}", event.name());
    }
    Ok(())
}

fn print_stats(stats: &ResourceStats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(stats)?);
    } else {
        println!(
            "stats  cpu {:>5.1}%  mem {:>6.0}/{:.0} MB ({:?})  tabs {} ({} sleeping)",
            stats.cpu_percent,
            stats.memory_used_mb,
            stats.memory_total_mb,
            stats.memory_pressure,
            stats.tab_count,
            stats.sleeping_count,
        );
    }
    Ok(())
}
