//! Channel subscription store
//!
//! The set of channels receiving release reminders, saved as a flat JSON
//! array of channel ids. Every change is written to a temporary file and
//! renamed over the target before the in-memory set is updated, so a failed
//! write leaves both copies unchanged.

use crate::error::{BotError, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Subscribed channel ids
#[derive(Debug)]
pub struct SubscriptionStore {
    path: Option<PathBuf>,
    channels: RwLock<BTreeSet<u64>>,
}

impl SubscriptionStore {
    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            channels: RwLock::new(BTreeSet::new()),
        }
    }

    /// Load the store from `path`; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let channels = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<u64>>(&bytes)
                .map_err(|e| {
                    BotError::StorageError(format!("{} is not a valid channel list: {}", path.display(), e))
                })?
                .into_iter()
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(BotError::StorageError(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        tracing::info!(path = %path.display(), channels = channels.len(), "Loaded subscriptions");
        Ok(Self {
            path: Some(path),
            channels: RwLock::new(channels),
        })
    }

    /// Add a channel; returns `true` if it was not already subscribed
    pub async fn subscribe(&self, channel_id: u64) -> Result<bool> {
        let mut channels = self.channels.write().await;
        if channels.contains(&channel_id) {
            return Ok(false);
        }

        let mut updated = channels.clone();
        updated.insert(channel_id);
        self.persist(&updated).await?;
        *channels = updated;

        tracing::info!(channel_id, "Channel subscribed");
        Ok(true)
    }

    /// Remove a channel; returns `true` if it was subscribed
    pub async fn unsubscribe(&self, channel_id: u64) -> Result<bool> {
        let mut channels = self.channels.write().await;
        if !channels.contains(&channel_id) {
            return Ok(false);
        }

        let mut updated = channels.clone();
        updated.remove(&channel_id);
        self.persist(&updated).await?;
        *channels = updated;

        tracing::info!(channel_id, "Channel unsubscribed");
        Ok(true)
    }

    /// Snapshot of subscribed channels, ascending
    pub async fn list_subscribers(&self) -> Vec<u64> {
        self.channels.read().await.iter().copied().collect()
    }

    pub async fn contains(&self, channel_id: u64) -> bool {
        self.channels.read().await.contains(&channel_id)
    }

    async fn persist(&self, channels: &BTreeSet<u64>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let list: Vec<u64> = channels.iter().copied().collect();
        let json = serde_json::to_vec_pretty(&list)?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write = async {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&tmp, &json).await?;
            tokio::fs::rename(&tmp, path).await
        };

        write.await.map_err(|e| {
            BotError::StorageError(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_subscribe_twice_keeps_one_entry() {
        let store = SubscriptionStore::in_memory();
        assert!(assert_ok!(store.subscribe(42).await));
        assert!(!assert_ok!(store.subscribe(42).await));
        assert_eq!(store.list_subscribers().await, vec![42]);
    }

    #[tokio::test]
    async fn test_unsubscribe_missing_channel_is_noop() {
        let store = SubscriptionStore::in_memory();
        store.subscribe(1).await.unwrap();
        assert!(!assert_ok!(store.unsubscribe(2).await));
        assert_eq!(store.list_subscribers().await, vec![1]);
    }

    #[tokio::test]
    async fn test_list_is_ascending() {
        let store = SubscriptionStore::in_memory();
        for id in [30, 10, 20] {
            store.subscribe(id).await.unwrap();
        }
        assert_eq!(store.list_subscribers().await, vec![10, 20, 30]);
        assert!(store.contains(20).await);
    }

    #[tokio::test]
    async fn test_subscriptions_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("channels.json");

        let store = SubscriptionStore::open(&path).await.unwrap();
        assert!(store.list_subscribers().await.is_empty());
        store.subscribe(111).await.unwrap();
        store.subscribe(222).await.unwrap();
        store.unsubscribe(111).await.unwrap();

        let reopened = SubscriptionStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_subscribers().await, vec![222]);

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<u64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec![222]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("channels.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SubscriptionStore::open(&path).await.unwrap_err();
        assert!(matches!(err, BotError::StorageError(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_set_unchanged() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("channels.json");
        std::fs::create_dir(&path).unwrap();

        let store = SubscriptionStore {
            path: Some(path),
            channels: RwLock::new(BTreeSet::new()),
        };
        assert!(store.subscribe(7).await.is_err());
        assert!(store.list_subscribers().await.is_empty());
    }
}
