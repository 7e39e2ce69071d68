use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted under the `resourceLimits` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceLimits {
    pub cpu_limit_pct: u32,
    pub ram_limit_mb: u32,
    /// Zero means unlimited.
    pub network_limit_kbps: u32,
    pub hot_tabs_killer: bool,
    pub hot_tabs_threshold_mb: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_limit_pct: 80,
            ram_limit_mb: 4096,
            network_limit_kbps: 0,
            hot_tabs_killer: false,
            hot_tabs_threshold_mb: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    #[default]
    Low,
    Normal,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn classify(used_mb: f64, limit_mb: u32) -> Self {
        let limit = f64::from(limit_mb);
        if limit <= 0.0 {
            return Self::Low;
        }
        if used_mb > limit * 2.0 {
            Self::Critical
        } else if used_mb > limit {
            Self::High
        } else if used_mb > limit / 2.0 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

/// Transient snapshot published after every sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    pub cpu_percent: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub network_in_kbps: f64,
    pub network_out_kbps: f64,
    pub tab_count: usize,
    pub sleeping_count: usize,
    pub tab_memory_mb: BTreeMap<String, f64>,
    pub memory_pressure: MemoryPressure,
    pub sampled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_levels() {
        assert_eq!(MemoryPressure::classify(1000.0, 4096), MemoryPressure::Low);
        assert_eq!(MemoryPressure::classify(3000.0, 4096), MemoryPressure::Normal);
        assert_eq!(MemoryPressure::classify(5000.0, 4096), MemoryPressure::High);
        assert_eq!(MemoryPressure::classify(9000.0, 4096), MemoryPressure::Critical);
        assert_eq!(MemoryPressure::classify(9000.0, 0), MemoryPressure::Low);
    }
}
