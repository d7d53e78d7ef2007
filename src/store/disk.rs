use crate::core::rates::{RawDocument, document_timestamp};
use crate::core::store::SnapshotStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "snapshots";

/// Snapshot store backed by a fjall partition.
///
/// Keys sort by capture time, then insertion time, so the last key is
/// always the most recent snapshot.
pub struct DiskSnapshotStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open snapshot store at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened snapshot store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

/// Order-preserving encoding of a signed microsecond timestamp.
fn encode_instant(instant: DateTime<Utc>) -> [u8; 8] {
    ((instant.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes()
}

fn snapshot_key(captured_at: DateTime<Utc>, inserted_at: DateTime<Utc>) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&encode_instant(captured_at));
    key[8..].copy_from_slice(&encode_instant(inserted_at));
    key
}

#[async_trait]
impl SnapshotStore for DiskSnapshotStore {
    async fn insert(&self, doc: RawDocument) -> Result<()> {
        let inserted_at = Utc::now();
        let captured_at = document_timestamp(&doc).unwrap_or(inserted_at);
        let value = serde_json::to_vec(&doc)?;

        self.partition
            .insert(snapshot_key(captured_at, inserted_at), value)
            .context("Failed to write snapshot")?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(%captured_at, "Snapshot INSERT");
        Ok(())
    }

    async fn latest(&self) -> Result<Option<RawDocument>> {
        let Some((_, value)) = self
            .partition
            .last_key_value()
            .context("Failed to read latest snapshot")?
        else {
            debug!("Snapshot store is empty");
            return Ok(None);
        };

        let doc: RawDocument =
            serde_json::from_slice(&value).context("Stored snapshot is not a JSON object")?;
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(ts: &str, yer: f64) -> RawDocument {
        json!({"base": "USD", "rates": {"YER": yer}, "ts": ts})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_disk_store_empty() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::open(dir.path()).unwrap();
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_latest_by_capture_time() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::open(dir.path()).unwrap();

        store.insert(doc("2026-10-19T12:00:00Z", 532.0)).await.unwrap();
        store.insert(doc("2026-10-19T09:00:00Z", 530.0)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest["rates"]["YER"], json!(532.0));
        assert_eq!(latest["ts"], json!("2026-10-19T12:00:00Z"));
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskSnapshotStore::open(dir.path()).unwrap();
            store.insert(doc("2026-10-19T12:00:00Z", 531.5)).await.unwrap();
        }

        let store = DiskSnapshotStore::open(dir.path()).unwrap();
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest["rates"]["YER"], json!(531.5));
    }

    #[test]
    fn test_key_order_follows_time() {
        let early = Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert!(encode_instant(early) < encode_instant(late));
        assert!(snapshot_key(late, early) < snapshot_key(late, late));
        assert!(snapshot_key(early, late) < snapshot_key(late, early));
    }
}
