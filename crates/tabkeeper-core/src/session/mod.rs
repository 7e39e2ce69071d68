//! Session snapshot domain models.

mod model;

pub use model::{Session, SessionTab, SessionWindow};
