//! Focus mode state machine.
//!
//! `Idle -> Active` on start, `Active -> Idle` on stop or when the duration
//! timer fires. Each start bumps a generation counter and the timer carries the
//! generation it was armed for, so a timer from an earlier session never ends a
//! later one.

use chrono::Duration as ChronoDuration;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::Result;
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::focus::{FocusModeConfig, FocusState, FocusStopReason};
use tabkeeper_core::store::{Store, StoreExt, settings_keys};

use crate::event_bus::EventBus;
use crate::scheduler::ScheduledTask;

#[derive(Default)]
struct FocusSession {
    config: FocusModeConfig,
    state: FocusState,
    generation: u64,
    timer: Option<ScheduledTask>,
    /// Sound announced when the current session started, if any.
    ambient: Option<String>,
}

pub struct FocusMode {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    session: Mutex<FocusSession>,
    state_tx: watch::Sender<FocusState>,
}

impl FocusMode {
    pub async fn load(store: Arc<dyn Store>, events: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let config: FocusModeConfig = store
            .get_setting(settings_keys::FOCUS_MODE, FocusModeConfig::default())
            .await?;
        let (state_tx, _) = watch::channel(FocusState::Idle);

        Ok(Self {
            store,
            events,
            clock,
            session: Mutex::new(FocusSession {
                config,
                ..Default::default()
            }),
            state_tx,
        })
    }

    pub async fn config(&self) -> FocusModeConfig {
        self.session.lock().await.config.clone()
    }

    /// Persists a new config. A running session picks up the new block list
    /// immediately; its duration is unaffected.
    pub async fn update_config(&self, config: FocusModeConfig) -> Result<()> {
        let mut session = self.session.lock().await;
        self.store
            .set_setting(settings_keys::FOCUS_MODE, &config)
            .await?;
        session.config = config;
        Ok(())
    }

    /// Starts a session. Returns false if one is already active.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut session = self.session.lock().await;
        if session.state.is_active() {
            return false;
        }

        let started_at = self.clock.now();
        let minutes = session.config.duration_minutes;
        let ends_at = (minutes > 0).then(|| started_at + ChronoDuration::minutes(i64::from(minutes)));

        session.generation += 1;
        let generation = session.generation;
        session.state = FocusState::Active { started_at, ends_at };
        session.timer = (minutes > 0).then(|| {
            let weak: Weak<Self> = Arc::downgrade(self);
            ScheduledTask::once(
                "focus-duration",
                Duration::from_secs(u64::from(minutes) * 60),
                async move {
                    if let Some(focus) = weak.upgrade() {
                        focus.elapse(generation).await;
                    }
                },
            )
        });
        let ambient = session
            .config
            .ambient_sounds
            .then(|| session.config.sound_type.clone());
        session.ambient = ambient.clone();

        let hide_ui = session.config.hide_ui;
        self.state_tx.send_replace(session.state.clone());
        drop(session);

        tracing::info!(target: "focus", "Focus session started ({} min)", minutes);
        self.events.publish(EngineEvent::Started {
            started_at,
            ends_at,
            hide_ui,
        });
        if let Some(sound_type) = ambient {
            self.events.publish(EngineEvent::AmbientSound {
                sound_type,
                playing: true,
            });
        }
        true
    }

    /// Ends the active session. Returns false if already idle.
    pub async fn stop(&self) -> bool {
        let mut session = self.session.lock().await;
        self.end(&mut session, FocusStopReason::Manual)
    }

    /// Starts when idle, stops when active. Returns whether focus is now active.
    pub async fn toggle(self: &Arc<Self>) -> bool {
        if self.state().is_active() {
            self.stop().await;
            false
        } else {
            self.start().await;
            true
        }
    }

    /// True only while active and the url's host matches the block list.
    pub async fn is_url_blocked(&self, url: &str) -> bool {
        let session = self.session.lock().await;
        session.state.is_active() && session.config.blocks(url)
    }

    pub fn state(&self) -> FocusState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FocusState> {
        self.state_tx.subscribe()
    }

    /// Ends an active session as a manual stop and cancels its timer.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        self.end(&mut session, FocusStopReason::Manual);
        if let Some(timer) = session.timer.take() {
            timer.stop();
        }
    }

    async fn elapse(&self, generation: u64) {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            tracing::debug!(target: "focus", "Ignoring stale focus timer");
            return;
        }
        self.end(&mut session, FocusStopReason::Elapsed);
    }

    fn end(&self, session: &mut FocusSession, reason: FocusStopReason) -> bool {
        if !session.state.is_active() {
            return false;
        }
        if let Some(timer) = session.timer.take() {
            timer.stop();
        }
        session.state = FocusState::Idle;
        let ambient = session.ambient.take();
        self.state_tx.send_replace(FocusState::Idle);

        tracing::info!(target: "focus", "Focus session stopped ({:?})", reason);
        self.events.publish(EngineEvent::Stopped { reason });
        if let Some(sound_type) = ambient {
            self.events.publish(EngineEvent::AmbientSound {
                sound_type,
                playing: false,
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::drain;
    use tabkeeper_core::clock::ManualClock;
    use tabkeeper_infrastructure::MemoryStore;

    async fn focus(config: FocusModeConfig) -> (Arc<FocusMode>, EventBus, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.init().await.unwrap();
        let events = EventBus::new(32);
        let focus = FocusMode::load(store.clone(), events.clone(), Arc::new(ManualClock::default()))
            .await
            .unwrap();
        focus.update_config(config).await.unwrap();
        (Arc::new(focus), events, store)
    }

    fn news_config(duration_minutes: u32) -> FocusModeConfig {
        FocusModeConfig {
            block_sites: vec!["news.example.com".into()],
            duration_minutes,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_ends_when_duration_elapses() {
        let (focus, events, _) = focus(news_config(1)).await;
        let mut rx = events.subscribe();
        let url = "https://news.example.com/a";

        assert!(!focus.is_url_blocked(url).await);
        assert!(focus.start().await);
        assert!(focus.is_url_blocked(url).await);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(focus.state(), FocusState::Idle);
        assert!(!focus.is_url_blocked(url).await);

        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&EngineEvent::Stopped {
            reason: FocusStopReason::Elapsed
        }));
    }

    #[tokio::test]
    async fn test_shutdown_ends_active_session() {
        let (focus, events, _) = focus(news_config(30)).await;
        let mut rx = events.subscribe();
        assert!(focus.start().await);

        focus.shutdown().await;
        focus.shutdown().await;

        assert_eq!(focus.state(), FocusState::Idle);
        assert!(!focus.is_url_blocked("https://news.example.com/a").await);
        let stops = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::Stopped { reason: FocusStopReason::Manual }))
            .count();
        assert_eq!(stops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_end_new_session() {
        let (focus, _, _) = focus(news_config(1)).await;
        assert!(focus.start().await);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(focus.stop().await);
        assert!(focus.start().await);

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(focus.state().is_active());
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!focus.state().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_runs_until_stopped() {
        let (focus, _, _) = focus(news_config(0)).await;
        focus.start().await;
        assert!(!focus.start().await);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(focus.state().is_active());
        assert!(!focus.toggle().await);
        assert!(!focus.stop().await);
    }

    #[tokio::test]
    async fn test_ambient_sound_signalled() {
        let (focus, events, _) = focus(FocusModeConfig {
            ambient_sounds: true,
            sound_type: "forest".into(),
            duration_minutes: 0,
            ..Default::default()
        })
        .await;
        let mut rx = events.subscribe();

        focus.toggle().await;
        focus.toggle().await;

        let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["started", "ambient-sound", "stopped", "ambient-sound"]);
    }

    #[tokio::test]
    async fn test_state_subscription_and_persisted_config() {
        let (focus, _, store) = focus(news_config(0)).await;
        let mut state = focus.subscribe();
        focus.start().await;
        state.changed().await.unwrap();
        assert!(state.borrow().is_active());

        let reloaded = FocusMode::load(store, EventBus::new(8), Arc::new(ManualClock::default()))
            .await
            .unwrap();
        assert_eq!(reloaded.config().await, news_config(0));
    }
}
