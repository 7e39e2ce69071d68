//! Command palette descriptors.
//!
//! The runnable command (with its action) lives in the application layer; this
//! module holds the serializable part the UI lists and searches.

mod model;

pub use model::{CommandCategory, CommandInfo};
