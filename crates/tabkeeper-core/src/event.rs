//! Events published on the engine's event channel.
//!
//! Policies never call into each other or into the tab host. Every cross-policy
//! effect and every host request is expressed as one of these events; the UI
//! layer decides whether and how to act on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::focus::FocusStopReason;
use crate::sleeping::SleepingTabEntry;
use crate::snooze::SnoozedTab;
use crate::video::FloatingVideo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// The owner confirmed it suspended a tab.
    Slept { entry: SleepingTabEntry },
    Woke { tab_id: String },
    /// A tab crossed the inactivity threshold; the owner should suspend it.
    ShouldSleep { tab_id: String },
    /// A tab went over the per-tab memory budget.
    ShouldSuspend { tab_id: String, memory_mb: f64 },
    Snoozed { snoozed: SnoozedTab },
    SnoozeCancelled { snoozed: SnoozedTab },
    /// A snoozed tab is due; the owner should reopen it.
    Waking { snoozed: SnoozedTab },
    /// Request to show a platform notification.
    Notify { title: String, body: String },
    /// Focus mode went active.
    Started {
        started_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        hide_ui: bool,
    },
    Stopped { reason: FocusStopReason },
    AmbientSound { sound_type: String, playing: bool },
    ShouldSaveSession { session_id: String },
    IslandChanged { island_id: String, change: ChangeKind },
    ContainerChanged { container_id: String, change: ChangeKind },
    BoostChanged { boost_id: String, change: ChangeKind },
    VideoOpened { video: FloatingVideo },
    VideoClosed { id: String },
    /// A command asked the host to do something (`new-tab`, `screenshot`, ...).
    Command { name: String },
}

impl EngineEvent {
    /// The stable wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            EngineEvent::Slept { .. } => "slept",
            EngineEvent::Woke { .. } => "woke",
            EngineEvent::ShouldSleep { .. } => "should-sleep",
            EngineEvent::ShouldSuspend { .. } => "should-suspend",
            EngineEvent::Snoozed { .. } => "snoozed",
            EngineEvent::SnoozeCancelled { .. } => "snooze-cancelled",
            EngineEvent::Waking { .. } => "waking",
            EngineEvent::Notify { .. } => "notify",
            EngineEvent::Started { .. } => "started",
            EngineEvent::Stopped { .. } => "stopped",
            EngineEvent::AmbientSound { .. } => "ambient-sound",
            EngineEvent::ShouldSaveSession { .. } => "should-save-session",
            EngineEvent::IslandChanged { .. } => "island-changed",
            EngineEvent::ContainerChanged { .. } => "container-changed",
            EngineEvent::BoostChanged { .. } => "boost-changed",
            EngineEvent::VideoOpened { .. } => "video-opened",
            EngineEvent::VideoClosed { .. } => "video-closed",
            EngineEvent::Command { name } => name,
        }
    }

    pub fn command(name: impl Into<String>) -> Self {
        EngineEvent::Command { name: name.into() }
    }
}
