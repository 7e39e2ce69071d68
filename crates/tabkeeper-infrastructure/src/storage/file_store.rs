//! File-backed `Store` implementation.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── islands.json
//! ├── containers.json
//! ├── boosts.json
//! ├── sessions.json
//! ├── snoozed.json
//! └── settings.json
//! ```
//!
//! Each file is a JSON object keyed by record id (or setting name).

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::Mutex;

use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::store::{Partition, Store};

use crate::paths::TabkeeperPaths;
use crate::storage::partition_file::PartitionFile;

pub struct FileStore {
    base_dir: PathBuf,
    initialized: AtomicBool,
    /// Serializes read-modify-write cycles on the partition files.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store at the default data directory (e.g. ~/.local/share/tabkeeper/store).
    pub fn new_default() -> Result<Self> {
        let base_dir = TabkeeperPaths::store_dir()
            .map_err(|e| TabkeeperError::config(format!("Failed to resolve data directory: {}", e)))?;
        Ok(Self::new(base_dir))
    }

    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            initialized: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file(&self, partition: Partition) -> PartitionFile {
        PartitionFile::new(self.base_dir.join(format!("{}.json", partition.as_str())))
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TabkeeperError::store_unavailable("store has not been initialized"))
        }
    }
}

#[async_trait]
impl Store for FileStore {
    async fn init(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            TabkeeperError::store_unavailable(format!(
                "Failed to create store directory {:?}: {}",
                self.base_dir, e
            ))
        })?;

        for partition in Partition::ALL {
            let file = self.file(partition);
            if !file.exists().await {
                file.save(&Default::default()).await?;
            } else {
                // Surface corrupt partitions at startup rather than on first use.
                file.load().await?;
            }
        }

        self.initialized.store(true, Ordering::Release);
        tracing::info!(target: "store", "File store ready at {:?}", self.base_dir);
        Ok(())
    }

    async fn put(&self, partition: Partition, key: &str, value: Value) -> Result<()> {
        self.ensure_initialized()?;
        let _guard = self.write_lock.lock().await;
        let file = self.file(partition);
        let mut data = file.load().await?;
        data.insert(key.to_string(), value);
        file.save(&data).await
    }

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>> {
        self.ensure_initialized()?;
        let mut data = self.file(partition).load().await?;
        Ok(data.remove(key))
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>> {
        self.ensure_initialized()?;
        Ok(self.file(partition).load().await?.into_values().collect())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
        self.ensure_initialized()?;
        let _guard = self.write_lock.lock().await;
        let file = self.file(partition);
        let mut data = file.load().await?;
        if data.remove(key).is_some() {
            file.save(&data).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabkeeper_core::store::StoreExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_every_partition() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.init().await.unwrap();
        store.init().await.unwrap();

        for partition in Partition::ALL {
            assert!(temp_dir.path().join(format!("{}.json", partition)).exists());
        }
    }

    #[tokio::test]
    async fn test_operations_require_init() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let err = store.get(Partition::Islands, "x").await.unwrap_err();
        assert!(matches!(err, TabkeeperError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.init().await.unwrap();

        store
            .put(Partition::Boosts, "b1", json!({"id": "b1", "enabled": true}))
            .await
            .unwrap();
        assert_eq!(
            store.get(Partition::Boosts, "b1").await.unwrap(),
            Some(json!({"id": "b1", "enabled": true}))
        );
        assert_eq!(store.get_all(Partition::Boosts).await.unwrap().len(), 1);
        assert!(store.get(Partition::Islands, "b1").await.unwrap().is_none());

        store.delete(Partition::Boosts, "b1").await.unwrap();
        store.delete(Partition::Boosts, "b1").await.unwrap();
        assert!(store.get_all(Partition::Boosts).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(temp_dir.path());
            store.init().await.unwrap();
            store.set_setting("theme", &"dark").await.unwrap();
        }

        let store = FileStore::new(temp_dir.path());
        store.init().await.unwrap();
        let theme: String = store.get_setting("theme", "light".to_string()).await.unwrap();
        assert_eq!(theme, "dark");
        let missing: u32 = store.get_setting("missing", 7).await.unwrap();
        assert_eq!(missing, 7);
    }
}
