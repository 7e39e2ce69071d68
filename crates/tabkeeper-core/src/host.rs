//! Host capability seam.
//!
//! The engine runs either against a real native tab host or in simulation.
//! The variant is picked once at startup and injected as an
//! `Arc<dyn HostCapabilities>`; nothing re-detects the host per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    HostBacked,
    Simulated,
}

/// One raw sample as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostResourceSample {
    pub cpu_percent: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub network_in_kbps: f64,
    pub network_out_kbps: f64,
    pub tab_count: usize,
    /// Memory per tab id, in megabytes.
    pub tab_memory_mb: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A reference to a video element living in some tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoHandle {
    pub element_id: String,
    pub video_url: String,
    #[serde(default)]
    pub bounds: Bounds,
}

#[async_trait]
pub trait HostCapabilities: Send + Sync {
    fn kind(&self) -> HostKind;

    async fn sample_resources(&self, tab_ids: &[String]) -> Result<HostResourceSample>;

    fn notifications_available(&self) -> bool;

    fn picture_in_picture_available(&self) -> bool;

    async fn enter_picture_in_picture(&self, handle: &VideoHandle) -> Result<()>;

    /// Exits whichever surface is currently in picture-in-picture.
    async fn exit_picture_in_picture(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionKind {
    Style,
    Script,
}

/// A page document that boosts can be injected into.
///
/// Elements are addressed by id so that injecting the same id twice replaces
/// the previous element instead of stacking a duplicate.
pub trait DocumentHandle: Send + Sync {
    fn upsert_element(&self, element_id: &str, kind: InjectionKind, content: &str) -> Result<()>;

    fn remove_element(&self, element_id: &str) -> Result<()>;
}
