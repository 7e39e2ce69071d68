use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// A tab closed now and scheduled to reopen at `wake_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozedTab {
    pub id: String,
    pub tab_id: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub snoozed_at: DateTime<Utc>,
    pub wake_at: DateTime<Utc>,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

impl SnoozedTab {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.wake_at <= now
    }
}

impl Record for SnoozedTab {
    fn record_id(&self) -> &str {
        &self.id
    }
}
