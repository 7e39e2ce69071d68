//! Atomic JSON file holding one partition.
//!
//! Provides a thin layer for crash-safe writes of a whole partition map.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use tabkeeper_core::error::{Result, TabkeeperError};

/// Records of a partition, keyed by id.
pub type PartitionMap = BTreeMap<String, Value>;

/// A handle to one partition's JSON file.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Durability**: Explicit fsync before rename
#[derive(Debug, Clone)]
pub struct PartitionFile {
    path: PathBuf,
}

impl PartitionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Loads the partition. A missing or empty file is an empty partition.
    pub async fn load(&self) -> Result<PartitionMap> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PartitionMap::new()),
            Err(e) => {
                return Err(TabkeeperError::io(format!(
                    "Failed to read {:?}: {}",
                    self.path, e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(PartitionMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the partition atomically.
    pub async fn save(&self, data: &PartitionMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(data)?;

        // Write to temporary file in the same directory
        let tmp_path = self.temp_path()?;
        let mut tmp_file = fs::File::create(&tmp_path).await?;
        tmp_file.write_all(json.as_bytes()).await?;

        // Ensure data is written to disk
        tmp_file.sync_all().await?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| TabkeeperError::io("Path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| TabkeeperError::io("Path has no file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}
