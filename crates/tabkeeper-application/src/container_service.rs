//! Identity container management and URL auto-assignment.
//!
//! URL matching walks containers in ascending `priority`; new containers are
//! appended after the current maximum, so by default earlier registrations win.
//! Default containers are seeded once, guarded by a persisted bootstrap flag
//! rather than by the store being empty. The flag is written only after every
//! default exists, so an interrupted seed is completed on the next load.

use std::sync::Arc;
use tokio::sync::Mutex;

use tabkeeper_core::clock::Clock;
use tabkeeper_core::container::{Container, ContainerPatch, default_containers};
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::{ChangeKind, EngineEvent};
use tabkeeper_core::new_id;
use tabkeeper_core::pattern::{UrlPattern, parse_url};
use tabkeeper_core::store::{Partition, Store, StoreExt, settings_keys};

use crate::event_bus::EventBus;

struct Entry {
    container: Container,
    patterns: Vec<UrlPattern>,
}

impl Entry {
    fn new(container: Container) -> Self {
        let patterns = container
            .url_patterns
            .iter()
            .filter_map(|p| match UrlPattern::new(p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(target: "containers", "Skipping pattern '{}' of '{}': {}", p, container.name, e);
                    None
                }
            })
            .collect();
        Self {
            container,
            patterns,
        }
    }
}

pub struct ContainerService {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    /// Sorted by (priority, created_at).
    entries: Mutex<Vec<Entry>>,
}

impl ContainerService {
    /// Loads containers and seeds the defaults on the very first run.
    pub async fn load(store: Arc<dyn Store>, events: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let containers: Vec<Container> = store.load_all(Partition::Containers).await?;
        let service = Self {
            store,
            events,
            clock,
            entries: Mutex::new(containers.into_iter().map(Entry::new).collect()),
        };
        service.sort().await;
        service.bootstrap().await?;
        Ok(service)
    }

    async fn bootstrap(&self) -> Result<()> {
        let bootstrapped: bool = self
            .store
            .get_setting(settings_keys::CONTAINERS_BOOTSTRAPPED, false)
            .await?;
        if bootstrapped {
            return Ok(());
        }

        let existing: Vec<String> = self
            .entries
            .lock()
            .await
            .iter()
            .map(|e| e.container.name.clone())
            .collect();
        let mut seeded = 0;
        for (name, color, icon) in default_containers() {
            if existing.iter().any(|n| n == name) {
                continue;
            }
            self.create(name, Some(color), Some(icon), Vec::new()).await?;
            seeded += 1;
        }
        if seeded > 0 {
            tracing::info!(target: "containers", "Seeded {} default containers", seeded);
        }

        self.store
            .set_setting(settings_keys::CONTAINERS_BOOTSTRAPPED, &true)
            .await
    }

    pub async fn create(
        &self,
        name: &str,
        color: Option<&str>,
        icon: Option<&str>,
        url_patterns: Vec<String>,
    ) -> Result<Container> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TabkeeperError::invalid_input("container name cannot be empty"));
        }
        validate_patterns(&url_patterns)?;

        let mut entries = self.entries.lock().await;
        let id = new_id();
        let container = Container {
            isolation_handle: format!("container-{}", id),
            id,
            name: name.to_string(),
            color: color.unwrap_or("blue").to_string(),
            icon: icon.unwrap_or("circle").to_string(),
            isolated: true,
            url_patterns,
            proxy: None,
            priority: entries
                .iter()
                .map(|e| e.container.priority + 1)
                .max()
                .unwrap_or(0),
            created_at: self.clock.now(),
        };

        self.store.save(Partition::Containers, &container).await?;
        entries.push(Entry::new(container.clone()));
        drop(entries);

        tracing::info!(target: "containers", "Created container '{}'", container.name);
        self.publish(&container.id, ChangeKind::Created);
        Ok(container)
    }

    pub async fn update(&self, container_id: &str, patch: ContainerPatch) -> Result<Container> {
        if let Some(patterns) = &patch.url_patterns {
            validate_patterns(patterns)?;
        }

        let mut entries = self.entries.lock().await;
        let index = entries
            .iter()
            .position(|e| e.container.id == container_id)
            .ok_or_else(|| TabkeeperError::not_found("container", container_id))?;

        let mut updated = entries[index].container.clone();
        patch.apply_to(&mut updated);
        self.store.save(Partition::Containers, &updated).await?;
        entries[index] = Entry::new(updated.clone());
        drop(entries);

        self.publish(container_id, ChangeKind::Updated);
        Ok(updated)
    }

    /// Deletes a container. Unknown ids are a no-op returning `false`.
    pub async fn delete(&self, container_id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|e| e.container.id == container_id) else {
            return Ok(false);
        };

        self.store.delete(Partition::Containers, container_id).await?;
        entries.remove(index);
        drop(entries);

        self.publish(container_id, ChangeKind::Deleted);
        Ok(true)
    }

    /// Rewrites priorities so that `ordered_ids` come first, in that order.
    /// Containers not listed keep their relative order after them.
    pub async fn reorder(&self, ordered_ids: &[String]) -> Result<Vec<Container>> {
        let mut entries = self.entries.lock().await;
        for id in ordered_ids {
            if !entries.iter().any(|e| &e.container.id == id) {
                return Err(TabkeeperError::not_found("container", id.clone()));
            }
        }

        let mut order: Vec<usize> = ordered_ids
            .iter()
            .filter_map(|id| entries.iter().position(|e| &e.container.id == id))
            .collect();
        order.dedup();
        for index in 0..entries.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }

        let mut changes: Vec<(usize, Container)> = Vec::new();
        for (priority, &index) in order.iter().enumerate() {
            let priority = priority as u32;
            if entries[index].container.priority == priority {
                continue;
            }
            let mut updated = entries[index].container.clone();
            updated.priority = priority;
            changes.push((index, updated));
        }

        for (written, (_, updated)) in changes.iter().enumerate() {
            let Err(err) = self.store.save(Partition::Containers, updated).await else {
                continue;
            };
            for (index, _) in changes[..written].iter().rev() {
                let previous = &entries[*index].container;
                if let Err(undo_err) = self.store.save(Partition::Containers, previous).await {
                    tracing::warn!(target: "containers", "Could not restore priority of '{}': {}", previous.name, undo_err);
                }
            }
            return Err(err);
        }

        for (index, updated) in &changes {
            entries[*index].container = updated.clone();
        }
        sort_entries(&mut entries);
        let reordered = entries.iter().map(|e| e.container.clone()).collect();
        drop(entries);

        for (_, updated) in &changes {
            self.publish(&updated.id, ChangeKind::Updated);
        }
        Ok(reordered)
    }

    pub async fn list(&self) -> Vec<Container> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.container.clone())
            .collect()
    }

    pub async fn get(&self, container_id: &str) -> Option<Container> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.container.id == container_id)
            .map(|e| e.container.clone())
    }

    /// The first container, by priority, with a pattern matching the url.
    pub async fn container_for_url(&self, url: &str) -> Option<Container> {
        let parsed = parse_url(url)?;
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.patterns.iter().any(|p| p.matches_url(&parsed)))
            .map(|e| e.container.clone())
    }

    async fn sort(&self) {
        sort_entries(&mut self.entries.lock().await);
    }

    fn publish(&self, container_id: &str, change: ChangeKind) {
        self.events.publish(EngineEvent::ContainerChanged {
            container_id: container_id.to_string(),
            change,
        });
    }
}

fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        a.container
            .priority
            .cmp(&b.container.priority)
            .then_with(|| a.container.created_at.cmp(&b.container.created_at))
    });
}

fn validate_patterns(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        if pattern.trim().is_empty() {
            return Err(TabkeeperError::invalid_input("url pattern cannot be empty"));
        }
        UrlPattern::new(pattern)?;
    }
    Ok(())
}
