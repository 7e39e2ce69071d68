//! Snoozed tabs and the wake sweep.
//!
//! Each due entry is deleted from the store before `waking` is published, so a
//! tab wakes exactly once even if a later sweep overlaps a slow store. The set
//! of snoozed tab ids is published on a watch channel for the sleeping policy,
//! and the sleeping policy's census is read back so a sleeping tab is never
//! snoozed while it still has a sleeping record.

use chrono::{DateTime, Local, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::host::HostCapabilities;
use tabkeeper_core::new_id;
use tabkeeper_core::snooze::{SnoozePreset, SnoozedTab, wake_time};
use tabkeeper_core::store::{Partition, Store, StoreExt};

use crate::event_bus::EventBus;
use crate::scheduler::ScheduledTask;
use crate::sleeping_policy::TabCensus;

/// What the caller knows about the tab being snoozed.
#[derive(Debug, Clone, Default)]
pub struct SnoozeRequest {
    pub tab_id: String,
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    pub notify: bool,
}

impl SnoozeRequest {
    pub fn new(tab_id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            url: url.into(),
            title: title.into(),
            favicon: None,
            notify: true,
        }
    }
}

pub struct SnoozePolicy {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    host: Arc<dyn HostCapabilities>,
    entries: Mutex<Vec<SnoozedTab>>,
    snoozed_ids: watch::Sender<BTreeSet<String>>,
    census: watch::Receiver<TabCensus>,
    timer: std::sync::Mutex<Option<ScheduledTask>>,
}

impl SnoozePolicy {
    /// Loads persisted entries and publishes their tab ids on `snoozed_ids`.
    /// `census` is the sleeping policy's view of awake and sleeping tabs.
    pub async fn load(
        store: Arc<dyn Store>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostCapabilities>,
        snoozed_ids: watch::Sender<BTreeSet<String>>,
        census: watch::Receiver<TabCensus>,
    ) -> Result<Self> {
        let entries: Vec<SnoozedTab> = store.load_all(Partition::Snoozed).await?;
        tracing::debug!(target: "snooze", "Loaded {} snoozed tabs", entries.len());
        snoozed_ids.send_replace(tab_ids(&entries));

        Ok(Self {
            store,
            events,
            clock,
            host,
            entries: Mutex::new(entries),
            snoozed_ids,
            census,
            timer: std::sync::Mutex::new(None),
        })
    }

    pub async fn snooze(&self, request: SnoozeRequest, wake_at: DateTime<Utc>) -> Result<SnoozedTab> {
        let now = self.clock.now();
        if wake_at <= now {
            return Err(TabkeeperError::invalid_input("wake time must be in the future"));
        }
        if self.census.borrow().sleeping.contains(&request.tab_id) {
            return Err(TabkeeperError::invalid_input(format!(
                "tab {} is sleeping and must be released before snoozing",
                request.tab_id
            )));
        }

        let snoozed = SnoozedTab {
            id: new_id(),
            tab_id: request.tab_id,
            url: request.url,
            title: request.title,
            favicon: request.favicon,
            snoozed_at: now,
            wake_at,
            notify: request.notify,
        };

        let mut entries = self.entries.lock().await;
        self.store.save(Partition::Snoozed, &snoozed).await?;
        entries.push(snoozed.clone());
        self.snoozed_ids.send_replace(tab_ids(&entries));
        drop(entries);

        tracing::info!(target: "snooze", "Snoozed tab {} until {}", snoozed.tab_id, snoozed.wake_at);
        self.events.publish(EngineEvent::Snoozed {
            snoozed: snoozed.clone(),
        });
        Ok(snoozed)
    }

    /// Snoozes until the preset's wake time in the local time zone.
    pub async fn snooze_until(&self, request: SnoozeRequest, preset: SnoozePreset) -> Result<SnoozedTab> {
        self.snooze(request, self.preset_wake_at(preset)).await
    }

    pub fn preset_wake_at(&self, preset: SnoozePreset) -> DateTime<Utc> {
        let now = self.clock.now().with_timezone(&Local);
        wake_time(preset, &now).with_timezone(&Utc)
    }

    /// Removes an entry and returns it. Unknown ids return `None` without
    /// touching the store.
    pub async fn cancel(&self, snooze_id: &str) -> Result<Option<SnoozedTab>> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|s| s.id == snooze_id) else {
            return Ok(None);
        };

        self.store.delete(Partition::Snoozed, snooze_id).await?;
        let removed = entries.remove(index);
        self.snoozed_ids.send_replace(tab_ids(&entries));
        drop(entries);

        self.events.publish(EngineEvent::SnoozeCancelled {
            snoozed: removed.clone(),
        });
        Ok(Some(removed))
    }

    /// All entries by ascending wake time.
    pub async fn list(&self) -> Vec<SnoozedTab> {
        let mut entries = self.entries.lock().await.clone();
        entries.sort_by(|a, b| a.wake_at.cmp(&b.wake_at).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub async fn get(&self, snooze_id: &str) -> Option<SnoozedTab> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|s| s.id == snooze_id)
            .cloned()
    }

    /// Wakes every due entry. Entries whose delete fails stay for the next sweep.
    pub async fn sweep(&self) -> Vec<SnoozedTab> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let mut due: Vec<SnoozedTab> = entries.iter().filter(|s| s.is_due(now)).cloned().collect();
        due.sort_by(|a, b| a.wake_at.cmp(&b.wake_at));

        let mut woken = Vec::with_capacity(due.len());
        for snoozed in due {
            if let Err(e) = self.store.delete(Partition::Snoozed, &snoozed.id).await {
                tracing::error!(target: "snooze", "Failed to remove due entry {}: {}", snoozed.id, e);
                continue;
            }
            entries.retain(|s| s.id != snoozed.id);
            woken.push(snoozed);
        }
        if !woken.is_empty() {
            self.snoozed_ids.send_replace(tab_ids(&entries));
        }
        drop(entries);

        let notify = self.host.notifications_available();
        for snoozed in &woken {
            tracing::info!(target: "snooze", "Waking tab {}", snoozed.tab_id);
            self.events.publish(EngineEvent::Waking {
                snoozed: snoozed.clone(),
            });
            if snoozed.notify && notify {
                self.events.publish(EngineEvent::Notify {
                    title: "Tab is back".to_string(),
                    body: snoozed.title.clone(),
                });
            }
        }
        woken
    }

    pub fn snoozed_tab_ids(&self) -> watch::Receiver<BTreeSet<String>> {
        self.snoozed_ids.subscribe()
    }

    pub fn start(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = ScheduledTask::periodic("snooze-sweep", period, move || {
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

fn tab_ids(entries: &[SnoozedTab]) -> BTreeSet<String> {
    entries.iter().map(|s| s.tab_id.clone()).collect()
}
