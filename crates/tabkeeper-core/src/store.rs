//! Persistent store contract.
//!
//! The store is a set of named partitions, each holding JSON records keyed by
//! the record's own `id` (or, for [`Partition::Settings`], by setting name).
//! Every operation is async and may fail; failures propagate to the caller and
//! are never retried here.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// The fixed set of partitions established at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Islands,
    Containers,
    Boosts,
    Sessions,
    Snoozed,
    Settings,
}

impl Partition {
    pub const ALL: [Partition; 6] = [
        Partition::Islands,
        Partition::Containers,
        Partition::Boosts,
        Partition::Sessions,
        Partition::Snoozed,
        Partition::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Islands => "islands",
            Partition::Containers => "containers",
            Partition::Boosts => "boosts",
            Partition::Sessions => "sessions",
            Partition::Snoozed => "snoozed",
            Partition::Settings => "settings",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record stored under its own id.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn record_id(&self) -> &str;
}

/// Raw keyed storage over JSON values.
#[async_trait]
pub trait Store: Send + Sync {
    /// Establishes every partition. Calling it again is a no-op.
    async fn init(&self) -> Result<()>;

    async fn put(&self, partition: Partition, key: &str, value: Value) -> Result<()>;

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>>;

    /// Returns every record of the partition in key order.
    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>>;

    /// Deletes a key. Deleting a missing key succeeds.
    async fn delete(&self, partition: Partition, key: &str) -> Result<()>;
}

/// Typed helpers layered over [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn save<T: Record>(&self, partition: Partition, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.put(partition, record.record_id(), value).await
    }

    async fn load<T: Record>(&self, partition: Partition, key: &str) -> Result<Option<T>> {
        match self.get(partition, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn load_all<T: Record>(&self, partition: Partition) -> Result<Vec<T>> {
        self.get_all(partition)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Into::into))
            .collect()
    }

    /// Reads a setting, falling back to `default` when it was never written.
    async fn get_setting<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(Partition::Settings, key).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(default),
        }
    }

    async fn set_setting<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.put(Partition::Settings, key, value).await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Setting keys owned by the policies.
pub mod settings_keys {
    pub const SLEEPING_TABS: &str = "sleepingTabs";
    pub const RESOURCE_LIMITS: &str = "resourceLimits";
    pub const FOCUS_MODE: &str = "focusMode";
    pub const CONTAINERS_BOOTSTRAPPED: &str = "containers.bootstrapped";
}
