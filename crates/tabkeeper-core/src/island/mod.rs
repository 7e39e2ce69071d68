//! Tab island domain models.
//!
//! Islands are named, colored, collapsible groupings of tab ids. A tab belongs
//! to at most one island at a time.

mod model;

pub use model::{ISLAND_COLORS, Island};
