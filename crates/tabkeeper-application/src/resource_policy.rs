//! Periodic resource sampling and hot-tab detection.
//!
//! Sampling is best-effort: a failing host degrades to an empty sample instead
//! of failing the tick. The policy never suspends anything itself; tabs over the
//! per-tab budget are reported with `should-suspend`.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::Result;
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::host::{HostCapabilities, HostResourceSample};
use tabkeeper_core::resource::{MemoryPressure, ResourceLimits, ResourceStats};
use tabkeeper_core::store::{Store, StoreExt, settings_keys};

use crate::event_bus::EventBus;
use crate::scheduler::ScheduledTask;
use crate::sleeping_policy::TabCensus;

pub struct ResourcePolicy {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    host: Arc<dyn HostCapabilities>,
    limits: Mutex<ResourceLimits>,
    census: watch::Receiver<TabCensus>,
    stats: watch::Sender<Option<ResourceStats>>,
    timer: std::sync::Mutex<Option<ScheduledTask>>,
}

impl ResourcePolicy {
    pub async fn load(
        store: Arc<dyn Store>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostCapabilities>,
        census: watch::Receiver<TabCensus>,
    ) -> Result<Self> {
        let limits: ResourceLimits = store
            .get_setting(settings_keys::RESOURCE_LIMITS, ResourceLimits::default())
            .await?;
        let (stats, _) = watch::channel(None);

        Ok(Self {
            store,
            events,
            clock,
            host,
            limits: Mutex::new(limits),
            census,
            stats,
            timer: std::sync::Mutex::new(None),
        })
    }

    pub async fn limits(&self) -> ResourceLimits {
        self.limits.lock().await.clone()
    }

    pub async fn update_limits(&self, limits: ResourceLimits) -> Result<()> {
        let mut current = self.limits.lock().await;
        self.store
            .set_setting(settings_keys::RESOURCE_LIMITS, &limits)
            .await?;
        *current = limits;
        Ok(())
    }

    /// Takes one sample, publishes it to stats subscribers and reports hot tabs.
    pub async fn sample_now(&self) -> ResourceStats {
        let census = self.census.borrow().clone();
        let awake: Vec<String> = census.awake.iter().cloned().collect();

        let sample = match self.host.sample_resources(&awake).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(target: "resources", "Resource sampling failed, using empty sample: {}", e);
                HostResourceSample::default()
            }
        };
        let limits = self.limits.lock().await.clone();

        let stats = ResourceStats {
            cpu_percent: sample.cpu_percent,
            memory_used_mb: sample.memory_used_mb,
            memory_total_mb: sample.memory_total_mb,
            network_in_kbps: sample.network_in_kbps,
            network_out_kbps: sample.network_out_kbps,
            tab_count: sample.tab_count + census.sleeping.len(),
            sleeping_count: census.sleeping.len(),
            memory_pressure: MemoryPressure::classify(sample.memory_used_mb, limits.ram_limit_mb),
            tab_memory_mb: sample.tab_memory_mb,
            sampled_at: self.clock.now(),
        };

        if limits.hot_tabs_killer {
            let threshold = f64::from(limits.hot_tabs_threshold_mb);
            for (tab_id, memory_mb) in &stats.tab_memory_mb {
                if *memory_mb > threshold && !census.sleeping.contains(tab_id) {
                    tracing::info!(target: "resources", "Tab {} over budget ({:.0} MB)", tab_id, memory_mb);
                    self.events.publish(EngineEvent::ShouldSuspend {
                        tab_id: tab_id.clone(),
                        memory_mb: *memory_mb,
                    });
                }
            }
        }

        self.stats.send_replace(Some(stats.clone()));
        stats
    }

    /// Stats subscription. Holds `None` until the first sample.
    pub fn subscribe(&self) -> watch::Receiver<Option<ResourceStats>> {
        self.stats.subscribe()
    }

    pub fn latest(&self) -> Option<ResourceStats> {
        self.stats.borrow().clone()
    }

    pub fn start(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = ScheduledTask::periodic("resource-sample", period, move || {
            let weak = weak.clone();
            async move {
                if let Some(policy) = weak.upgrade() {
                    policy.sample_now().await;
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
