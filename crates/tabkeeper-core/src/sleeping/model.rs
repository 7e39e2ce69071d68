use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::UrlPattern;

/// Inactivity policy settings, persisted under `sleepingTabs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SleepingTabsConfig {
    pub enabled: bool,
    pub inactivity_minutes: u32,
    pub exclude_pinned: bool,
    pub exclude_audio: bool,
    /// Glob patterns; matching tabs never sleep.
    pub excluded_urls: Vec<String>,
    pub fade_effect: bool,
}

impl Default for SleepingTabsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inactivity_minutes: 30,
            exclude_pinned: true,
            exclude_audio: true,
            excluded_urls: Vec::new(),
            fade_effect: true,
        }
    }
}

impl SleepingTabsConfig {
    /// Whether a tab with these traits is exempt from inactivity sleep.
    pub fn excludes(&self, traits: &TabTraits) -> bool {
        if self.exclude_pinned && traits.pinned {
            return true;
        }
        if self.exclude_audio && traits.audible {
            return true;
        }
        match &traits.url {
            Some(url) => self
                .excluded_urls
                .iter()
                .filter_map(|p| UrlPattern::new(p).ok())
                .any(|p| p.matches(url)),
            None => false,
        }
    }
}

/// Per-tab facts only the tab owner knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabTraits {
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepingTabEntry {
    pub tab_id: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub sleeping_since: DateTime<Utc>,
    /// Megabytes released when the tab was suspended.
    pub memory_freed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepingStats {
    pub sleeping_count: usize,
    pub tracked_count: usize,
    pub total_memory_freed: f64,
}
