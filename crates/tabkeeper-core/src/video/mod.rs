//! Floating (picture-in-picture) video bookkeeping.

use serde::{Deserialize, Serialize};

use crate::host::Bounds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingVideo {
    pub id: String,
    pub tab_id: String,
    pub video_url: String,
    pub bounds: Bounds,
    pub always_on_top: bool,
}
