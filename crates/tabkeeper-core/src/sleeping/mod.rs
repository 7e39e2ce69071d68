//! Sleeping-tab domain models.

mod model;

pub use model::{SleepingStats, SleepingTabEntry, SleepingTabsConfig, TabTraits};
