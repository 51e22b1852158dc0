// # File State Store
//
// File-based implementation of StateStore with crash recovery, for running
// outside a cluster.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the state file
// - Backup: the previous state file is copied to `<path>.backup` first
// - Recovery: a state file that fails to parse is replaced from the backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "dns-tools-gip": {
//       "address": "203.0.113.1",
//       "updated_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::StateStore;

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// One persisted address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Last observed address
    pub address: IpAddr,
    /// When it was stored
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFileFormat {
    version: String,
    entries: HashMap<String, StateEntry>,
}

enum LoadError {
    Corrupt(String),
    Io(String),
}

/// File-based state store with crash recovery
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, StateEntry>>,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// Creates missing parent directories. A corrupted state file is
    /// recovered from its backup; if that fails too the store starts empty.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let key = path.display().to_string();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::persistence(&key, format!("Failed to create state directory {}: {}", parent.display(), e))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full entry for a key, including its timestamp
    pub async fn entry(&self, key: &str) -> Option<StateEntry> {
        self.entries.read().await.get(key).cloned()
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, StateEntry>, Error> {
        match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded state from {}: {} entries", path.display(), entries.len());
                Ok(entries)
            }
            Err(LoadError::Io(message)) => Err(Error::persistence(path.display().to_string(), message)),
            Err(LoadError::Corrupt(message)) => {
                tracing::warn!("State file appears corrupted: {}. Attempting recovery from backup.", message);

                let backup = Self::backup_path(path);
                if !backup.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup).await {
                    Ok(entries) => {
                        tracing::info!("Recovered state from backup: {} entries", entries.len());
                        if let Err(e) = fs::copy(&backup, path).await {
                            tracing::error!("Failed to restore state file from backup: {}", e);
                        }
                        Ok(entries)
                    }
                    Err(_) => {
                        tracing::error!("Backup also unreadable. Starting with empty state.");
                        Ok(HashMap::new())
                    }
                }
            }
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, StateEntry>, LoadError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::Io(format!("Failed to read state file {}: {}", path.display(), e)))?;

        let state: StateFileFormat = serde_json::from_str(&content)
            .map_err(|e| LoadError::Corrupt(format!("{}: {}", path.display(), e)))?;

        if state.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Loading anyway.",
                STATE_FILE_VERSION,
                state.version
            );
        }

        Ok(state.entries)
    }

    async fn write(&self, key: &str, entries: &HashMap<String, StateEntry>) -> Result<(), Error> {
        let state = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| Error::persistence(key, format!("Failed to serialize state: {}", e)))?;

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                Error::persistence(key, format!("Failed to create {}: {}", temp.display(), e))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(key, format!("Failed to write {}: {}", temp.display(), e))
            })?;
            file.flush().await.map_err(|e| {
                Error::persistence(key, format!("Failed to flush {}: {}", temp.display(), e))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::persistence(
                key,
                format!("Failed to rename {} to {}: {}", temp.display(), self.path.display(), e),
            )
        })?;

        tracing::trace!("State written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        Self::sibling(&self.path, ".tmp")
    }

    fn backup_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".backup")
    }

    /// `<path><suffix>`, keeping any existing extension
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_previous(&self, key: &str) -> Result<Option<IpAddr>, Error> {
        Ok(self.entries.read().await.get(key).map(|e| e.address))
    }

    async fn upsert(&self, key: &str, ip: IpAddr) -> Result<(), Error> {
        // Hold the write lock across the disk write so concurrent upserts
        // cannot interleave their renames.
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(
            key.to_string(),
            StateEntry {
                address: ip,
                updated_at: Utc::now(),
            },
        );

        self.write(key, &next).await?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        assert_eq!(store.get_previous("gip").await.unwrap(), None);

        let ip: IpAddr = "203.0.113.1".parse().unwrap();
        store.upsert("gip", ip).await.unwrap();
        assert!(path.exists());
        assert!(store.entry("gip").await.is_some());

        let reopened = FileStateStore::new(&path).await.unwrap();
        assert_eq!(reopened.get_previous("gip").await.unwrap(), Some(ip));
    }

    #[tokio::test]
    async fn test_file_store_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        let first: IpAddr = "203.0.113.1".parse().unwrap();
        let second: IpAddr = "203.0.113.2".parse().unwrap();
        store.upsert("gip", first).await.unwrap();
        store.upsert("gip", second).await.unwrap();

        assert!(FileStateStore::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        // The backup holds the state from before the last write
        let recovered = FileStateStore::new(&path).await.unwrap();
        assert_eq!(recovered.get_previous("gip").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_backup_survives_tmp_named_state_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gip.tmp");

        let store = FileStateStore::new(&path).await.unwrap();
        assert_eq!(store.temp_path(), dir.path().join("gip.tmp.tmp"));
        assert_eq!(FileStateStore::backup_path(&path), dir.path().join("gip.tmp.backup"));

        let first: IpAddr = "203.0.113.1".parse().unwrap();
        let second: IpAddr = "203.0.113.2".parse().unwrap();
        store.upsert("gip", first).await.unwrap();
        store.upsert("gip", second).await.unwrap();

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileStateStore::new(&path).await.unwrap();
        assert_eq!(recovered.get_previous("gip").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        store.upsert("gip", "203.0.113.1".parse().unwrap()).await.unwrap();
        assert!(path.exists());
    }
}
