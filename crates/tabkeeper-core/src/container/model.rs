//! Container domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// `http`, `https` or `socks5`.
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    /// Storage partition name handed to the host when opening tabs in this container.
    pub isolation_handle: String,
    #[serde(default = "default_isolated")]
    pub isolated: bool,
    #[serde(default)]
    pub url_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Lower value is consulted first by URL matching.
    #[serde(default)]
    pub priority: u32,
    pub created_at: DateTime<Utc>,
}

fn default_isolated() -> bool {
    true
}

impl Record for Container {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Partial update applied by `update(id, patch)`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub isolated: Option<bool>,
    pub url_patterns: Option<Vec<String>>,
    /// `Some(None)` clears the proxy.
    pub proxy: Option<Option<ProxyConfig>>,
}

impl ContainerPatch {
    pub fn apply_to(self, container: &mut Container) {
        if let Some(name) = self.name {
            container.name = name;
        }
        if let Some(color) = self.color {
            container.color = color;
        }
        if let Some(icon) = self.icon {
            container.icon = icon;
        }
        if let Some(isolated) = self.isolated {
            container.isolated = isolated;
        }
        if let Some(patterns) = self.url_patterns {
            container.url_patterns = patterns;
        }
        if let Some(proxy) = self.proxy {
            container.proxy = proxy;
        }
    }
}

/// Name, color and icon of the containers seeded on first run.
pub fn default_containers() -> [(&'static str, &'static str, &'static str); 4] {
    [
        ("Personal", "blue", "fingerprint"),
        ("Work", "orange", "briefcase"),
        ("Shopping", "pink", "cart"),
        ("Banking", "green", "dollar"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container {
            id: "c1".into(),
            name: "Work".into(),
            color: "orange".into(),
            icon: "briefcase".into(),
            isolation_handle: "container-c1".into(),
            isolated: true,
            url_patterns: vec![],
            proxy: Some(ProxyConfig {
                scheme: "socks5".into(),
                host: "127.0.0.1".into(),
                port: 1080,
            }),
            priority: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut c = container();
        ContainerPatch {
            name: Some("Office".into()),
            url_patterns: Some(vec!["*.corp.example".into()]),
            ..Default::default()
        }
        .apply_to(&mut c);
        assert_eq!(c.name, "Office");
        assert_eq!(c.color, "orange");
        assert_eq!(c.url_patterns, vec!["*.corp.example"]);
        assert!(c.proxy.is_some());
    }

    #[test]
    fn test_patch_can_clear_proxy() {
        let mut c = container();
        ContainerPatch {
            proxy: Some(None),
            ..Default::default()
        }
        .apply_to(&mut c);
        assert!(c.proxy.is_none());
    }
}
