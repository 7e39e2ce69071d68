//! Site boost domain models.
//!
//! A boost is a per-site style and/or script modification keyed by a URL
//! pattern. Injected elements carry the boost id so reapplying replaces them.

mod model;

pub use model::{Boost, BoostPatch, BoostSource};
