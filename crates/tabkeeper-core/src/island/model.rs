//! Island domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Palette used when an island is created without an explicit color.
pub const ISLAND_COLORS: [&str; 8] = [
    "blue", "red", "yellow", "green", "pink", "purple", "cyan", "orange",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Island {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
    /// Ordered, duplicate-free.
    #[serde(default)]
    pub tab_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Island {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            collapsed: false,
            tab_ids: Vec::new(),
            created_at,
        }
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.tab_ids.iter().any(|t| t == tab_id)
    }

    /// Appends the tab unless it is already a member. Returns whether it was added.
    pub fn insert_tab(&mut self, tab_id: &str) -> bool {
        if self.contains(tab_id) {
            return false;
        }
        self.tab_ids.push(tab_id.to_string());
        true
    }

    /// Returns whether the tab was a member.
    pub fn remove_tab(&mut self, tab_id: &str) -> bool {
        let before = self.tab_ids.len();
        self.tab_ids.retain(|t| t != tab_id);
        before != self.tab_ids.len()
    }
}

impl Record for Island {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_duplicate_free() {
        let mut island = Island::new("i1", "Research", "blue", Utc::now());
        assert!(island.insert_tab("t1"));
        assert!(!island.insert_tab("t1"));
        assert!(island.insert_tab("t2"));
        assert_eq!(island.tab_ids, vec!["t1", "t2"]);
    }

    #[test]
    fn test_remove_tab() {
        let mut island = Island::new("i1", "Research", "blue", Utc::now());
        island.insert_tab("t1");
        assert!(island.remove_tab("t1"));
        assert!(!island.remove_tab("t1"));
        assert!(island.tab_ids.is_empty());
    }
}
