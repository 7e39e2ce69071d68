use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::host_of;

/// Persisted under the `focusMode` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusModeConfig {
    pub enabled: bool,
    pub hide_ui: bool,
    pub block_sites: Vec<String>,
    /// Zero means the session runs until stopped.
    pub duration_minutes: u32,
    pub ambient_sounds: bool,
    pub sound_type: String,
}

impl Default for FocusModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hide_ui: true,
            block_sites: vec![
                "twitter.com".to_string(),
                "x.com".to_string(),
                "facebook.com".to_string(),
                "instagram.com".to_string(),
                "reddit.com".to_string(),
                "youtube.com".to_string(),
            ],
            duration_minutes: 25,
            ambient_sounds: false,
            sound_type: "rain".to_string(),
        }
    }
}

impl FocusModeConfig {
    /// True when the url's hostname contains any blocklist entry.
    pub fn blocks(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.block_sites
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .any(|site| host.contains(&site))
    }
}

/// Transient run state; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FocusState {
    #[default]
    Idle,
    Active {
        started_at: DateTime<Utc>,
        #[serde(default)]
        ends_at: Option<DateTime<Utc>>,
    },
}

impl FocusState {
    pub fn is_active(&self) -> bool {
        matches!(self, FocusState::Active { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusStopReason {
    Manual,
    Elapsed,
}
