//! Inactivity-based tab sleeping.
//!
//! The policy only decides. A sweep publishes `should-sleep` for tabs over the
//! inactivity threshold; the tab owner suspends the tab and confirms through
//! [`SleepingTabPolicy::sleep`]. A tab is requested at most once per threshold
//! crossing: the request flag clears only on fresh activity.
//!
//! Snoozed tabs are never proposed nor recorded, checked against the snooze
//! policy's published id set at decision time.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::pattern::compile_all;
use tabkeeper_core::sleeping::{SleepingStats, SleepingTabEntry, SleepingTabsConfig, TabTraits};
use tabkeeper_core::store::{Store, StoreExt, settings_keys};

use crate::event_bus::EventBus;
use crate::scheduler::ScheduledTask;

/// Which tabs the policy currently knows about, split by state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabCensus {
    pub awake: BTreeSet<String>,
    pub sleeping: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy)]
struct Activity {
    last_active: DateTime<Utc>,
    sleep_requested: bool,
}

#[derive(Default)]
struct SleepingState {
    config: SleepingTabsConfig,
    activity: HashMap<String, Activity>,
    traits: HashMap<String, TabTraits>,
    sleeping: BTreeMap<String, SleepingTabEntry>,
}

impl SleepingState {
    fn census(&self) -> TabCensus {
        TabCensus {
            awake: self.activity.keys().cloned().collect(),
            sleeping: self.sleeping.keys().cloned().collect(),
        }
    }
}

pub struct SleepingTabPolicy {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    state: Mutex<SleepingState>,
    census: watch::Sender<TabCensus>,
    snoozed: watch::Receiver<BTreeSet<String>>,
    timer: std::sync::Mutex<Option<ScheduledTask>>,
}

impl SleepingTabPolicy {
    /// Loads the persisted config. `snoozed` carries the ids of currently
    /// snoozed tabs.
    pub async fn load(
        store: Arc<dyn Store>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        snoozed: watch::Receiver<BTreeSet<String>>,
    ) -> Result<Self> {
        let config: SleepingTabsConfig = store
            .get_setting(settings_keys::SLEEPING_TABS, SleepingTabsConfig::default())
            .await?;
        let (census, _) = watch::channel(TabCensus::default());

        Ok(Self {
            store,
            events,
            clock,
            state: Mutex::new(SleepingState {
                config,
                ..Default::default()
            }),
            census,
            snoozed,
            timer: std::sync::Mutex::new(None),
        })
    }

    pub async fn config(&self) -> SleepingTabsConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn update_config(&self, config: SleepingTabsConfig) -> Result<()> {
        let (_, invalid) = compile_all(&config.excluded_urls);
        if let Some(pattern) = invalid.first() {
            return Err(TabkeeperError::invalid_input(format!(
                "invalid excluded url pattern: {}",
                pattern
            )));
        }

        let mut state = self.state.lock().await;
        self.store
            .set_setting(settings_keys::SLEEPING_TABS, &config)
            .await?;
        state.config = config;
        Ok(())
    }

    /// Stamps the tab as active now. A sleeping tab is woken first.
    /// Returns true when the tab was woken.
    pub async fn record_activity(&self, tab_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let woke = state.sleeping.remove(tab_id).is_some();
        state.activity.insert(
            tab_id.to_string(),
            Activity {
                last_active: self.clock.now(),
                sleep_requested: false,
            },
        );
        self.census.send_replace(state.census());
        drop(state);

        if woke {
            tracing::debug!(target: "sleeping", "Activity woke tab {}", tab_id);
            self.events.publish(EngineEvent::Woke {
                tab_id: tab_id.to_string(),
            });
        }
        woke
    }

    pub async fn set_tab_traits(&self, tab_id: &str, traits: TabTraits) {
        self.state
            .lock()
            .await
            .traits
            .insert(tab_id.to_string(), traits);
    }

    /// Drops everything known about a tab, e.g. once it was closed.
    pub async fn forget(&self, tab_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let had_activity = state.activity.remove(tab_id).is_some();
        let had_entry = state.sleeping.remove(tab_id).is_some();
        state.traits.remove(tab_id);
        if had_activity || had_entry {
            self.census.send_replace(state.census());
        }
        had_activity || had_entry
    }

    /// Removes the tab's sleeping record without publishing `woke`, for a tab
    /// that is about to be closed by its owner.
    pub async fn take_sleeping(&self, tab_id: &str) -> Option<SleepingTabEntry> {
        let mut state = self.state.lock().await;
        let entry = state.sleeping.remove(tab_id)?;
        self.census.send_replace(state.census());
        Some(entry)
    }

    /// Puts back a record removed by [`take_sleeping`](Self::take_sleeping).
    /// Ignored if the tab was seen active in the meantime.
    pub async fn restore_sleeping(&self, entry: SleepingTabEntry) {
        let mut state = self.state.lock().await;
        if state.activity.contains_key(&entry.tab_id) {
            return;
        }
        state.sleeping.insert(entry.tab_id.clone(), entry);
        self.census.send_replace(state.census());
    }

    /// Publishes `should-sleep` for every tab that crossed the inactivity
    /// threshold since its last activity. Returns the requested tab ids.
    pub async fn sweep(&self) -> Vec<String> {
        let now = self.clock.now();
        let snoozed = self.snoozed.borrow().clone();

        let mut state = self.state.lock().await;
        if !state.config.enabled {
            return Vec::new();
        }
        let threshold = ChronoDuration::minutes(i64::from(state.config.inactivity_minutes));

        let SleepingState {
            config,
            activity,
            traits,
            sleeping,
        } = &mut *state;

        let mut requested = Vec::new();
        for (tab_id, tab) in activity.iter_mut() {
            if tab.sleep_requested || sleeping.contains_key(tab_id) || snoozed.contains(tab_id) {
                continue;
            }
            if traits.get(tab_id).is_some_and(|t| config.excludes(t)) {
                continue;
            }
            if now - tab.last_active >= threshold {
                tab.sleep_requested = true;
                requested.push(tab_id.clone());
            }
        }
        drop(state);

        requested.sort();
        for tab_id in &requested {
            self.events.publish(EngineEvent::ShouldSleep {
                tab_id: tab_id.clone(),
            });
        }
        if !requested.is_empty() {
            tracing::info!(target: "sleeping", "Requested sleep for {} tabs", requested.len());
        }
        requested
    }

    /// Records that the owner suspended the tab.
    pub async fn sleep(
        &self,
        tab_id: &str,
        url: &str,
        title: &str,
        favicon: Option<String>,
        memory_freed: f64,
    ) -> Result<SleepingTabEntry> {
        if self.snoozed.borrow().contains(tab_id) {
            return Err(TabkeeperError::invalid_input(format!(
                "tab {} is snoozed and cannot sleep",
                tab_id
            )));
        }

        let entry = SleepingTabEntry {
            tab_id: tab_id.to_string(),
            url: url.to_string(),
            title: title.to_string(),
            favicon,
            sleeping_since: self.clock.now(),
            memory_freed: memory_freed.max(0.0),
        };

        let mut state = self.state.lock().await;
        state.activity.remove(tab_id);
        state.sleeping.insert(tab_id.to_string(), entry.clone());
        self.census.send_replace(state.census());
        drop(state);

        tracing::info!(target: "sleeping", "Tab {} is sleeping ({:.0} MB freed)", tab_id, entry.memory_freed);
        self.events.publish(EngineEvent::Slept {
            entry: entry.clone(),
        });
        Ok(entry)
    }

    /// Wakes a sleeping tab. Unknown or awake tabs return `None`.
    pub async fn wake(&self, tab_id: &str) -> Option<SleepingTabEntry> {
        let mut state = self.state.lock().await;
        let entry = state.sleeping.remove(tab_id)?;
        state.activity.insert(
            tab_id.to_string(),
            Activity {
                last_active: self.clock.now(),
                sleep_requested: false,
            },
        );
        self.census.send_replace(state.census());
        drop(state);

        self.events.publish(EngineEvent::Woke {
            tab_id: tab_id.to_string(),
        });
        Some(entry)
    }

    pub async fn wake_all(&self) -> Vec<SleepingTabEntry> {
        let ids: Vec<String> = self.state.lock().await.sleeping.keys().cloned().collect();
        let mut woken = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.wake(&id).await {
                woken.push(entry);
            }
        }
        woken
    }

    pub async fn is_sleeping(&self, tab_id: &str) -> bool {
        self.state.lock().await.sleeping.contains_key(tab_id)
    }

    /// Sleeping entries, longest asleep first.
    pub async fn sleeping_tabs(&self) -> Vec<SleepingTabEntry> {
        let mut entries: Vec<_> = self.state.lock().await.sleeping.values().cloned().collect();
        entries.sort_by(|a, b| a.sleeping_since.cmp(&b.sleeping_since));
        entries
    }

    pub async fn stats(&self) -> SleepingStats {
        let state = self.state.lock().await;
        SleepingStats {
            sleeping_count: state.sleeping.len(),
            tracked_count: state.activity.len() + state.sleeping.len(),
            total_memory_freed: state.sleeping.values().map(|e| e.memory_freed).sum(),
        }
    }

    pub fn census(&self) -> watch::Receiver<TabCensus> {
        self.census.subscribe()
    }

    /// Starts the periodic inactivity sweep. Restarting replaces the timer.
    pub fn start(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = ScheduledTask::periodic("sleep-sweep", period, move || {
            let weak = weak.clone();
            async move {
                if let Some(policy) = weak.upgrade() {
                    policy.sweep().await;
                }
            }
        });

        let mut timer = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = timer.replace(task) {
            previous.stop();
        }
    }

    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = timer.take() {
            task.stop();
        }
    }
}
