//! Resource budget domain models.

mod model;

pub use model::{MemoryPressure, ResourceLimits, ResourceStats};
