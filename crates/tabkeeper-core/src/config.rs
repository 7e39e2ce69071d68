//! Engine configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so a partial or missing file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub resource_sample_interval_ms: u64,
    pub sleep_sweep_interval_ms: u64,
    pub snooze_sweep_interval_ms: u64,
    /// Capacity of the broadcast event channel. Slow subscribers lag past it.
    pub event_capacity: usize,
    /// Overrides the platform data directory for the file store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resource_sample_interval_ms: 2_000,
            sleep_sweep_interval_ms: 60_000,
            snooze_sweep_interval_ms: 60_000,
            event_capacity: 256,
            data_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn resource_sample_interval(&self) -> Duration {
        Duration::from_millis(self.resource_sample_interval_ms.max(1))
    }

    pub fn sleep_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_sweep_interval_ms.max(1))
    }

    pub fn snooze_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.snooze_sweep_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("snooze_sweep_interval_ms = 5000").unwrap();
        assert_eq!(config.snooze_sweep_interval_ms, 5000);
        assert_eq!(config.resource_sample_interval_ms, 2000);
        assert_eq!(config.event_capacity, 256);
        assert!(config.data_dir.is_none());
    }
}
