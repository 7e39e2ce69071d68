//! Focus mode domain models.

mod model;

pub use model::{FocusModeConfig, FocusState, FocusStopReason};
