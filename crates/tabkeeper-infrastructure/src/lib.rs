pub mod config_service;
pub mod paths;
pub mod simulated_host;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::simulated_host::SimulatedHost;
pub use crate::storage::{FileStore, MemoryStore};
