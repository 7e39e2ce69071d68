//! Tab island management.
//!
//! Every mutation writes the changed islands to the store first and only then
//! updates the in-memory copy, so a failed write leaves both sides as they were.
//! Moves touching several islands write the destination first and undo the
//! writes already made when a later one fails.
//! A tab belongs to at most one island; adding it elsewhere moves it.

use std::sync::Arc;
use tokio::sync::Mutex;

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::{ChangeKind, EngineEvent};
use tabkeeper_core::island::{ISLAND_COLORS, Island};
use tabkeeper_core::new_id;
use tabkeeper_core::store::{Partition, Store, StoreExt};

use crate::event_bus::EventBus;

pub struct IslandService {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    /// Ordered by creation time.
    islands: Mutex<Vec<Island>>,
}

impl IslandService {
    pub async fn load(store: Arc<dyn Store>, events: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut islands: Vec<Island> = store.load_all(Partition::Islands).await?;
        islands.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tracing::debug!(target: "islands", "Loaded {} islands", islands.len());

        Ok(Self {
            store,
            events,
            clock,
            islands: Mutex::new(islands),
        })
    }

    pub async fn create(
        &self,
        name: &str,
        color: Option<&str>,
        initial_tab_ids: &[String],
    ) -> Result<Island> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TabkeeperError::invalid_input("island name cannot be empty"));
        }

        let mut islands = self.islands.lock().await;
        let color = color
            .map(str::to_string)
            .unwrap_or_else(|| ISLAND_COLORS[islands.len() % ISLAND_COLORS.len()].to_string());
        let mut island = Island::new(new_id(), name, color, self.clock.now());
        for tab_id in initial_tab_ids {
            island.insert_tab(tab_id);
        }

        let detached = Self::detach_plan(&islands, initial_tab_ids, None);
        let mut changes = vec![(None, island.clone())];
        changes.extend(detached.iter().map(|(index, updated)| (Some(islands[*index].clone()), updated.clone())));
        self.persist_all(&changes).await?;

        for (index, updated) in &detached {
            islands[*index] = updated.clone();
        }
        islands.push(island.clone());
        drop(islands);

        tracing::info!(target: "islands", "Created island '{}' ({})", island.name, island.id);
        for (_, updated) in &detached {
            self.publish(&updated.id, ChangeKind::Updated);
        }
        self.publish(&island.id, ChangeKind::Created);
        Ok(island)
    }

    /// Moves `tab_id` into the island, removing it from any other island.
    /// On failure the tab stays where it was.
    pub async fn add_tab(&self, island_id: &str, tab_id: &str) -> Result<Island> {
        let mut islands = self.islands.lock().await;
        let index = Self::position(&islands, island_id)?;
        if islands[index].contains(tab_id) {
            return Ok(islands[index].clone());
        }

        let mut target = islands[index].clone();
        target.insert_tab(tab_id);
        let detached = Self::detach_plan(&islands, &[tab_id.to_string()], Some(island_id));
        let mut changes = vec![(Some(islands[index].clone()), target.clone())];
        changes.extend(detached.iter().map(|(i, updated)| (Some(islands[*i].clone()), updated.clone())));
        self.persist_all(&changes).await?;

        islands[index] = target.clone();
        for (i, updated) in &detached {
            islands[*i] = updated.clone();
        }
        drop(islands);

        for (_, updated) in &detached {
            self.publish(&updated.id, ChangeKind::Updated);
        }
        self.publish(island_id, ChangeKind::Updated);
        Ok(target)
    }

    /// Removes the tab from whichever island holds it. Returns that island, if any.
    pub async fn remove_tab(&self, tab_id: &str) -> Result<Option<Island>> {
        let mut islands = self.islands.lock().await;
        let detached = Self::detach_plan(&islands, &[tab_id.to_string()], None);
        let changes: Vec<_> = detached
            .iter()
            .map(|(index, updated)| (Some(islands[*index].clone()), updated.clone()))
            .collect();
        self.persist_all(&changes).await?;

        for (index, updated) in &detached {
            islands[*index] = updated.clone();
        }
        drop(islands);

        for (_, updated) in &detached {
            self.publish(&updated.id, ChangeKind::Updated);
        }
        Ok(detached.into_iter().last().map(|(_, updated)| updated))
    }

    /// Deletes an island. Deleting an unknown id is a no-op returning `false`.
    pub async fn delete(&self, island_id: &str) -> Result<bool> {
        let mut islands = self.islands.lock().await;
        let Some(index) = islands.iter().position(|i| i.id == island_id) else {
            return Ok(false);
        };

        self.store.delete(Partition::Islands, island_id).await?;
        islands.remove(index);
        drop(islands);

        self.publish(island_id, ChangeKind::Deleted);
        Ok(true)
    }

    /// Flips the collapsed flag and returns the new value.
    pub async fn toggle_collapsed(&self, island_id: &str) -> Result<bool> {
        let updated = self
            .modify(island_id, |island| island.collapsed = !island.collapsed)
            .await?;
        Ok(updated.collapsed)
    }

    pub async fn rename(&self, island_id: &str, name: &str) -> Result<Island> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TabkeeperError::invalid_input("island name cannot be empty"));
        }
        self.modify(island_id, |island| island.name = name.to_string())
            .await
    }

    pub async fn set_color(&self, island_id: &str, color: &str) -> Result<Island> {
        self.modify(island_id, |island| island.color = color.to_string())
            .await
    }

    pub async fn list(&self) -> Vec<Island> {
        self.islands.lock().await.clone()
    }

    pub async fn get(&self, island_id: &str) -> Option<Island> {
        self.islands
            .lock()
            .await
            .iter()
            .find(|i| i.id == island_id)
            .cloned()
    }

    pub async fn island_for_tab(&self, tab_id: &str) -> Option<Island> {
        self.islands
            .lock()
            .await
            .iter()
            .find(|i| i.contains(tab_id))
            .cloned()
    }

    fn position(islands: &[Island], island_id: &str) -> Result<usize> {
        islands
            .iter()
            .position(|i| i.id == island_id)
            .ok_or_else(|| TabkeeperError::not_found("island", island_id))
    }

    async fn modify(&self, island_id: &str, change: impl FnOnce(&mut Island)) -> Result<Island> {
        let mut islands = self.islands.lock().await;
        let index = Self::position(&islands, island_id)?;

        let mut updated = islands[index].clone();
        change(&mut updated);
        self.store.save(Partition::Islands, &updated).await?;
        islands[index] = updated.clone();
        drop(islands);

        self.publish(island_id, ChangeKind::Updated);
        Ok(updated)
    }

    /// Islands other than `keep` that hold any of `tab_ids`, with those tabs removed.
    fn detach_plan(islands: &[Island], tab_ids: &[String], keep: Option<&str>) -> Vec<(usize, Island)> {
        islands
            .iter()
            .enumerate()
            .filter(|(_, island)| Some(island.id.as_str()) != keep)
            .filter(|(_, island)| tab_ids.iter().any(|tab_id| island.contains(tab_id)))
            .map(|(index, island)| {
                let mut updated = island.clone();
                for tab_id in tab_ids {
                    updated.remove_tab(tab_id);
                }
                (index, updated)
            })
            .collect()
    }

    /// Writes each `(previous, updated)` pair in order. If one write fails,
    /// the pairs already written are put back (a `None` previous means the
    /// island was new and gets deleted) and the error is returned.
    async fn persist_all(&self, changes: &[(Option<Island>, Island)]) -> Result<()> {
        for (written, (_, updated)) in changes.iter().enumerate() {
            let Err(err) = self.store.save(Partition::Islands, updated).await else {
                continue;
            };
            for (previous, updated) in changes[..written].iter().rev() {
                let undone = match previous {
                    Some(previous) => self.store.save(Partition::Islands, previous).await,
                    None => self.store.delete(Partition::Islands, &updated.id).await,
                };
                if let Err(undo_err) = undone {
                    tracing::warn!(target: "islands", "Could not restore island {}: {}", updated.id, undo_err);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn publish(&self, island_id: &str, change: ChangeKind) {
        self.events.publish(EngineEvent::IslandChanged {
            island_id: island_id.to_string(),
            change,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::drain;
    use tabkeeper_core::clock::ManualClock;
    use tabkeeper_infrastructure::MemoryStore;

    async fn service() -> (IslandService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.init().await.unwrap();
        let service = IslandService::load(
            store.clone(),
            EventBus::new(64),
            Arc::new(ManualClock::default()),
        )
        .await
        .unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_add_tab_moves_between_islands() {
        let (service, _) = service().await;
        let a = service.create("A", None, &[]).await.unwrap();
        let b = service.create("B", None, &[]).await.unwrap();

        service.add_tab(&a.id, "t1").await.unwrap();
        service.add_tab(&b.id, "t1").await.unwrap();

        assert_eq!(service.island_for_tab("t1").await.unwrap().id, b.id);
        assert!(!service.get(&a.id).await.unwrap().contains("t1"));
    }

    #[tokio::test]
    async fn test_create_with_initial_tabs_steals_them() {
        let (service, _) = service().await;
        let a = service
            .create("A", Some("red"), &["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();
        let b = service.create("B", None, &["t2".to_string()]).await.unwrap();

        assert_eq!(service.get(&a.id).await.unwrap().tab_ids, vec!["t1"]);
        assert_eq!(b.tab_ids, vec!["t2"]);
        assert_eq!(a.color, "red");
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let (service, store) = service().await;
        let a = service.create("Reading", None, &[]).await.unwrap();
        service.add_tab(&a.id, "t9").await.unwrap();
        service.toggle_collapsed(&a.id).await.unwrap();

        let reloaded = IslandService::load(store, EventBus::new(8), Arc::new(ManualClock::default()))
            .await
            .unwrap();
        let island = reloaded.get(&a.id).await.unwrap();
        assert!(island.collapsed);
        assert_eq!(island.tab_ids, vec!["t9"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let (service, store) = service().await;
        let a = service.create("A", None, &[]).await.unwrap();

        store.set_unavailable(true);
        assert!(service.add_tab(&a.id, "t1").await.is_err());
        store.set_unavailable(false);

        assert!(service.island_for_tab("t1").await.is_none());
    }

    async fn reload(store: Arc<MemoryStore>) -> IslandService {
        IslandService::load(store, EventBus::new(8), Arc::new(ManualClock::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_failed_move_keeps_tab_in_source_island() {
        let (service, store) = service().await;
        let a = service.create("A", None, &["t1".to_string()]).await.unwrap();
        let b = service.create("B", None, &[]).await.unwrap();

        // Destination write succeeds, the detach from A fails.
        store.fail_nth_write(2);
        assert!(service.add_tab(&b.id, "t1").await.is_err());

        assert_eq!(service.island_for_tab("t1").await.unwrap().id, a.id);
        assert!(!service.get(&b.id).await.unwrap().contains("t1"));

        let reloaded = reload(store).await;
        assert_eq!(reloaded.get(&a.id).await.unwrap().tab_ids, vec!["t1"]);
        assert!(reloaded.get(&b.id).await.unwrap().tab_ids.is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_keeps_initial_tabs_in_place() {
        let (service, store) = service().await;
        let a = service.create("A", None, &["t1".to_string()]).await.unwrap();

        store.fail_nth_write(2);
        assert!(service.create("B", None, &["t1".to_string()]).await.is_err());

        assert_eq!(service.list().await.len(), 1);
        assert_eq!(service.island_for_tab("t1").await.unwrap().id, a.id);

        let reloaded = reload(store).await;
        let islands = reloaded.list().await;
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].tab_ids, vec!["t1"]);
    }

    #[tokio::test]
    async fn test_remove_tab_persists() {
        let (service, store) = service().await;
        let a = service.create("A", None, &["t1".to_string()]).await.unwrap();

        let changed = service.remove_tab("t1").await.unwrap().unwrap();
        assert_eq!(changed.id, a.id);
        assert!(reload(store).await.island_for_tab("t1").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_island() {
        let (service, _) = service().await;
        let err = service.add_tab("nope", "t1").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!service.delete("nope").await.unwrap());
        assert!(service.remove_tab("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_events_published() {
        let (service, _) = service().await;
        let mut rx = service.events.subscribe();
        let a = service.create("A", None, &[]).await.unwrap();
        service.delete(&a.id).await.unwrap();

        let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["island-changed", "island-changed"]);
        assert!(service.list().await.is_empty());
    }
}
