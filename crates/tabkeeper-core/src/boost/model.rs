//! Boost domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostSource {
    #[default]
    User,
    Community,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    pub id: String,
    pub name: String,
    pub url_pattern: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub source: BoostSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Boost {
    /// Element id of the injected style block.
    pub fn style_element_id(&self) -> String {
        format!("tabkeeper-boost-style-{}", self.id)
    }

    /// Element id of the injected script block.
    pub fn script_element_id(&self) -> String {
        format!("tabkeeper-boost-script-{}", self.id)
    }
}

impl Record for Boost {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Partial update; `Some(None)` on `css`/`js` removes that block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostPatch {
    pub name: Option<String>,
    pub url_pattern: Option<String>,
    pub enabled: Option<bool>,
    pub css: Option<Option<String>>,
    pub js: Option<Option<String>>,
    pub rating: Option<f32>,
}

impl BoostPatch {
    pub fn apply_to(self, boost: &mut Boost, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            boost.name = name;
        }
        if let Some(pattern) = self.url_pattern {
            boost.url_pattern = pattern;
        }
        if let Some(enabled) = self.enabled {
            boost.enabled = enabled;
        }
        if let Some(css) = self.css {
            boost.css = css;
        }
        if let Some(js) = self.js {
            boost.js = js;
        }
        if let Some(rating) = self.rating {
            boost.rating = Some(rating);
        }
        boost.updated_at = now;
    }
}
