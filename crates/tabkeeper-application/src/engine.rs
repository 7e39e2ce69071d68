//! Engine facade.
//!
//! [`Engine::init`] is the only way to obtain an engine, so nothing can be
//! called before the store is initialized and every policy has loaded. The
//! engine owns the event bus, wires the cross-policy watch channels and starts
//! the periodic timers. [`Engine::destroy`] stops every timer and may be called
//! any number of times.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};

use tabkeeper_core::clock::Clock;
use tabkeeper_core::config::EngineConfig;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::focus::FocusState;
use tabkeeper_core::host::{HostCapabilities, HostKind};
use tabkeeper_core::resource::ResourceStats;
use tabkeeper_core::snooze::{SnoozePreset, SnoozedTab};
use tabkeeper_core::store::Store;

use crate::boost_service::BoostService;
use crate::command_registry::CommandRegistry;
use crate::container_service::ContainerService;
use crate::event_bus::EventBus;
use crate::focus_mode::FocusMode;
use crate::island_service::IslandService;
use crate::resource_policy::ResourcePolicy;
use crate::session_service::SessionService;
use crate::sleeping_policy::SleepingTabPolicy;
use crate::snooze_policy::{SnoozePolicy, SnoozeRequest};
use crate::video_tracker::VideoTracker;

pub struct Engine {
    config: EngineConfig,
    host: Arc<dyn HostCapabilities>,
    events: EventBus,
    islands: IslandService,
    containers: ContainerService,
    boosts: BoostService,
    sessions: Arc<SessionService>,
    sleeping: Arc<SleepingTabPolicy>,
    resources: Arc<ResourcePolicy>,
    snooze: Arc<SnoozePolicy>,
    commands: CommandRegistry,
    focus: Arc<FocusMode>,
    videos: VideoTracker,
    destroyed: AtomicBool,
}

impl Engine {
    /// Initializes the store, loads every policy and starts the timers.
    ///
    /// Any store failure here is fatal and no engine is returned.
    pub async fn init(
        store: Arc<dyn Store>,
        host: Arc<dyn HostCapabilities>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self> {
        store.init().await?;
        let events = EventBus::new(config.event_capacity);

        let (snoozed_ids, snoozed_rx) = watch::channel(BTreeSet::new());
        let sleeping = Arc::new(
            SleepingTabPolicy::load(store.clone(), events.clone(), clock.clone(), snoozed_rx).await?,
        );
        let snooze = Arc::new(
            SnoozePolicy::load(
                store.clone(),
                events.clone(),
                clock.clone(),
                host.clone(),
                snoozed_ids,
                sleeping.census(),
            )
            .await?,
        );
        let resources = Arc::new(
            ResourcePolicy::load(
                store.clone(),
                events.clone(),
                clock.clone(),
                host.clone(),
                sleeping.census(),
            )
            .await?,
        );
        let islands = IslandService::load(store.clone(), events.clone(), clock.clone()).await?;
        let containers = ContainerService::load(store.clone(), events.clone(), clock.clone()).await?;
        let boosts = BoostService::load(store.clone(), events.clone(), clock.clone()).await?;
        let sessions = Arc::new(SessionService::load(store.clone(), events.clone(), clock.clone()).await?);
        let focus = Arc::new(FocusMode::load(store.clone(), events.clone(), clock.clone()).await?);
        let commands = CommandRegistry::with_defaults(&events);
        let videos = VideoTracker::new(host.clone(), events.clone());

        resources.start(config.resource_sample_interval());
        sleeping.start(config.sleep_sweep_interval());
        snooze.start(config.snooze_sweep_interval());

        tracing::info!(target: "engine", "Engine initialized ({:?} host)", host.kind());
        Ok(Self {
            config,
            host,
            events,
            islands,
            containers,
            boosts,
            sessions,
            sleeping,
            resources,
            snooze,
            commands,
            focus,
            videos,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Stops every timer and ends an active focus session. Subsequent calls
    /// are no-ops.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.resources.stop();
        self.sleeping.stop();
        self.snooze.stop();
        self.sessions.shutdown().await;
        self.focus.shutdown().await;
        tracing::info!(target: "engine", "Engine destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host_kind(&self) -> HostKind {
        self.host.kind()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn resource_stats(&self) -> watch::Receiver<Option<ResourceStats>> {
        self.resources.subscribe()
    }

    pub fn focus_state(&self) -> watch::Receiver<FocusState> {
        self.focus.subscribe()
    }

    pub fn islands(&self) -> &IslandService {
        &self.islands
    }

    pub fn containers(&self) -> &ContainerService {
        &self.containers
    }

    pub fn boosts(&self) -> &BoostService {
        &self.boosts
    }

    pub fn sessions(&self) -> &Arc<SessionService> {
        &self.sessions
    }

    pub fn sleeping(&self) -> &Arc<SleepingTabPolicy> {
        &self.sleeping
    }

    pub fn resources(&self) -> &Arc<ResourcePolicy> {
        &self.resources
    }

    pub fn snooze(&self) -> &Arc<SnoozePolicy> {
        &self.snooze
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn focus(&self) -> &Arc<FocusMode> {
        &self.focus
    }

    pub fn videos(&self) -> &VideoTracker {
        &self.videos
    }

    /// Snoozes a tab and drops its sleeping and island state, since the owner
    /// closes a snoozed tab. If the snooze fails the sleeping record is put back.
    pub async fn snooze_tab(&self, request: SnoozeRequest, wake_at: DateTime<Utc>) -> Result<SnoozedTab> {
        self.ensure_live()?;
        let asleep = self.sleeping.take_sleeping(&request.tab_id).await;
        let snoozed = match self.snooze.snooze(request, wake_at).await {
            Ok(snoozed) => snoozed,
            Err(e) => {
                if let Some(entry) = asleep {
                    self.sleeping.restore_sleeping(entry).await;
                }
                return Err(e);
            }
        };
        self.release_tab(&snoozed.tab_id).await;
        Ok(snoozed)
    }

    pub async fn snooze_tab_until(&self, request: SnoozeRequest, preset: SnoozePreset) -> Result<SnoozedTab> {
        let wake_at = self.snooze.preset_wake_at(preset);
        self.snooze_tab(request, wake_at).await
    }

    /// Forgets a closed tab in every policy that tracks tabs.
    pub async fn tab_closed(&self, tab_id: &str) -> Result<()> {
        self.ensure_live()?;
        self.sleeping.forget(tab_id).await;
        self.islands.remove_tab(tab_id).await?;
        Ok(())
    }

    async fn release_tab(&self, tab_id: &str) {
        self.sleeping.forget(tab_id).await;
        if let Err(e) = self.islands.remove_tab(tab_id).await {
            tracing::warn!(target: "engine", "Snoozed tab {} kept its island: {}", tab_id, e);
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(TabkeeperError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::drain;
    use crate::test_support::FakeHost;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use tabkeeper_core::clock::ManualClock;
    use tabkeeper_infrastructure::{MemoryStore, SimulatedHost};

    async fn engine() -> (Engine, Arc<ManualClock>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let engine = Engine::init(
            store.clone(),
            Arc::new(FakeHost::default()),
            clock.clone(),
            EngineConfig::default(),
        )
        .await
        .unwrap();
        (engine, clock, store)
    }

    #[tokio::test]
    async fn test_init_fails_when_store_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let result = Engine::init(
            store,
            Arc::new(SimulatedHost::with_seed(7)),
            Arc::new(ManualClock::default()),
            EngineConfig::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_snoozed_tab_leaves_sleep_and_islands() {
        let (engine, clock, _) = engine().await;
        let island = engine.islands().create("Reading", None, &["t1".to_string()]).await.unwrap();
        engine
            .sleeping()
            .sleep("t1", "https://a.example", "A", None, 80.0)
            .await
            .unwrap();

        engine
            .snooze_tab(
                SnoozeRequest::new("t1", "https://a.example", "A"),
                clock.now() + ChronoDuration::hours(1),
            )
            .await
            .unwrap();

        assert!(!engine.sleeping().is_sleeping("t1").await);
        assert!(!engine.islands().get(&island.id).await.unwrap().contains("t1"));
        assert!(
            engine
                .sleeping()
                .sleep("t1", "https://a.example", "A", None, 80.0)
                .await
                .is_err()
        );
        engine.destroy().await;
    }

    #[tokio::test]
    async fn test_sleeping_tab_cannot_be_snoozed_directly() {
        let (engine, clock, _) = engine().await;
        engine
            .sleeping()
            .sleep("t1", "https://a.example", "A", None, 80.0)
            .await
            .unwrap();

        let err = engine
            .snooze()
            .snooze(
                SnoozeRequest::new("t1", "https://a.example", "A"),
                clock.now() + ChronoDuration::hours(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TabkeeperError::InvalidInput(_)));
        assert!(engine.sleeping().is_sleeping("t1").await);
        assert!(engine.snooze().list().await.is_empty());
        engine.destroy().await;
    }

    #[tokio::test]
    async fn test_failed_snooze_keeps_tab_sleeping() {
        let (engine, clock, store) = engine().await;
        engine
            .sleeping()
            .sleep("t1", "https://a.example", "A", None, 80.0)
            .await
            .unwrap();

        store.set_unavailable(true);
        let result = engine
            .snooze_tab(
                SnoozeRequest::new("t1", "https://a.example", "A"),
                clock.now() + ChronoDuration::hours(1),
            )
            .await;
        store.set_unavailable(false);

        assert!(result.is_err());
        assert!(engine.sleeping().is_sleeping("t1").await);
        assert!(engine.snooze().list().await.is_empty());
        engine.destroy().await;
    }

    #[tokio::test]
    async fn test_destroy_ends_focus_session() {
        let (engine, _, _) = engine().await;
        let mut rx = engine.subscribe();
        assert!(engine.focus().start().await);
        assert!(engine.focus().is_url_blocked("https://www.youtube.com/watch").await);

        engine.destroy().await;

        assert_eq!(engine.focus_state().borrow().clone(), FocusState::Idle);
        assert!(!engine.focus().is_url_blocked("https://www.youtube.com/watch").await);
        let stopped = drain(&mut rx).into_iter().filter(|e| e.name() == "stopped").count();
        assert_eq!(stopped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_timers() {
        let (engine, _, _) = engine().await;
        let mut stats = engine.resource_stats();
        stats.changed().await.unwrap();
        assert!(stats.borrow().is_some());

        engine.destroy().await;
        engine.destroy().await;
        assert!(engine.is_destroyed());

        stats.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!stats.has_changed().unwrap());
        assert!(matches!(
            engine.tab_closed("t1").await,
            Err(TabkeeperError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_defaults_available_after_init() {
        let (engine, _, _) = engine().await;
        let mut rx = engine.subscribe();

        assert_eq!(engine.containers().list().await.len(), 4);
        let hits = engine.commands().search("focus");
        let toggle = hits.iter().find(|c| c.name == "Toggle Focus Mode").unwrap();
        assert!(engine.commands().execute(&toggle.id).await.unwrap());
        assert_eq!(drain(&mut rx), vec![EngineEvent::command("toggle-focus-mode")]);
        assert_eq!(engine.focus_state().borrow().clone(), FocusState::Idle);
        assert_eq!(engine.host_kind(), HostKind::HostBacked);
        engine.destroy().await;
    }
}
