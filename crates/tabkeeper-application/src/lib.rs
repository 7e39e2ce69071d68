//! Application layer: the policies, their timers and the engine facade.
//!
//! Each policy owns exactly one store partition (or setting) and is the only
//! writer to it. Policies never call each other; cross-policy effects travel as
//! [`EngineEvent`](tabkeeper_core::event::EngineEvent)s on the [`EventBus`] or
//! as watch-channel snapshots wired up by [`Engine::init`].

pub mod boost_service;
pub mod command_registry;
pub mod container_service;
pub mod engine;
pub mod event_bus;
pub mod focus_mode;
pub mod island_service;
pub mod resource_policy;
pub mod scheduler;
pub mod session_service;
pub mod sleeping_policy;
pub mod snooze_policy;
pub mod video_tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use boost_service::BoostService;
pub use command_registry::{Command, CommandRegistry};
pub use container_service::ContainerService;
pub use engine::Engine;
pub use event_bus::EventBus;
pub use focus_mode::FocusMode;
pub use island_service::IslandService;
pub use resource_policy::ResourcePolicy;
pub use scheduler::ScheduledTask;
pub use session_service::SessionService;
pub use sleeping_policy::{SleepingTabPolicy, TabCensus};
pub use snooze_policy::{SnoozePolicy, SnoozeRequest};
pub use video_tracker::VideoTracker;
