//! In-memory `Store` implementation.
//!
//! Used for ephemeral runs and tests. It can be switched into an
//! "unavailable" mode in which every operation fails, or armed to fail one
//! upcoming write, to exercise the store-failure paths of the policies.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::store::{Partition, Store};

#[derive(Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<Partition, BTreeMap<String, Value>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
    /// Countdown to the next injected write failure; zero when disarmed.
    fail_countdown: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `put`/`delete` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the `n`th write from now (1-based) fail once with
    /// `StoreUnavailable`. Writes before and after it succeed. `0` disarms.
    pub fn fail_nth_write(&self, n: usize) {
        self.fail_countdown.store(n, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        let previous = self
            .fail_countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) {
            Err(TabkeeperError::store_unavailable("injected write failure"))
        } else {
            Ok(())
        }
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TabkeeperError::store_unavailable("memory store switched off"))
        } else {
            Ok(())
        }
    }

    fn with_partitions<R>(
        &self,
        f: impl FnOnce(&mut HashMap<Partition, BTreeMap<String, Value>>) -> R,
    ) -> Result<R> {
        self.check()?;
        let mut guard = self
            .partitions
            .lock()
            .map_err(|_| TabkeeperError::internal("memory store lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&self) -> Result<()> {
        self.with_partitions(|partitions| {
            for partition in Partition::ALL {
                partitions.entry(partition).or_default();
            }
        })
    }

    async fn put(&self, partition: Partition, key: &str, value: Value) -> Result<()> {
        self.check_write()?;
        self.with_partitions(|partitions| {
            partitions
                .entry(partition)
                .or_default()
                .insert(key.to_string(), value);
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>> {
        self.with_partitions(|partitions| {
            partitions
                .get(&partition)
                .and_then(|records| records.get(key))
                .cloned()
        })
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>> {
        self.with_partitions(|partitions| {
            partitions
                .get(&partition)
                .map(|records| records.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
        self.check_write()?;
        self.with_partitions(|partitions| {
            if let Some(records) = partitions.get_mut(&partition) {
                records.remove(key);
            }
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unavailable_mode_fails_everything() {
        let store = MemoryStore::new();
        store.init().await.unwrap();
        store.set_unavailable(true);
        assert!(store.put(Partition::Islands, "a", json!({})).await.is_err());
        assert!(store.get_all(Partition::Islands).await.is_err());
        assert_eq!(store.writes(), 0);

        store.set_unavailable(false);
        store.put(Partition::Islands, "a", json!({})).await.unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_fail_nth_write_fails_once() {
        let store = MemoryStore::new();
        store.init().await.unwrap();
        store.fail_nth_write(2);

        store.put(Partition::Islands, "a", json!(1)).await.unwrap();
        let err = store.put(Partition::Islands, "b", json!(2)).await.unwrap_err();
        assert!(matches!(err, TabkeeperError::StoreUnavailable(_)));
        store.delete(Partition::Islands, "a").await.unwrap();

        assert_eq!(store.writes(), 2);
        assert!(store.get(Partition::Islands, "b").await.unwrap().is_none());
        assert!(store.get(Partition::Islands, "a").await.unwrap().is_none());
    }
}
