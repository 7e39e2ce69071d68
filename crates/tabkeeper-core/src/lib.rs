//! Domain layer of the tab lifecycle and resource-policy engine.
//!
//! Holds the models every policy persists, the [`store::Store`] and
//! [`host::HostCapabilities`] seams, and the [`event::EngineEvent`] vocabulary.
//! Nothing in this crate performs I/O.

pub mod boost;
pub mod clock;
pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod focus;
pub mod host;
pub mod island;
pub mod pattern;
pub mod resource;
pub mod session;
pub mod sleeping;
pub mod snooze;
pub mod store;
pub mod video;

// Re-export common error type
pub use error::{Result, TabkeeperError};

/// Generates a fresh opaque record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
