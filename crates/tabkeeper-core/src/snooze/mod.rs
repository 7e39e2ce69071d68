//! Snoozed-tab domain models and wake-time presets.

mod model;
mod preset;

pub use model::SnoozedTab;
pub use preset::{SnoozePreset, wake_time};
