use crate::core::rates::{RawDocument, document_timestamp};
use crate::core::store::SnapshotStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct StoredSnapshot {
    captured_at: DateTime<Utc>,
    doc: RawDocument,
}

/// In-memory snapshot store, kept in insertion order.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<Vec<StoredSnapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert(&self, doc: RawDocument) -> Result<()> {
        let captured_at = document_timestamp(&doc).unwrap_or_else(Utc::now);
        let mut snapshots = self.inner.lock().await;
        debug!(%captured_at, "Snapshot INSERT");
        snapshots.push(StoredSnapshot { captured_at, doc });
        Ok(())
    }

    async fn latest(&self) -> Result<Option<RawDocument>> {
        let snapshots = self.inner.lock().await;
        // max_by keeps the last of equal elements, so ties go to the newest insert.
        let latest = snapshots
            .iter()
            .max_by(|a, b| a.captured_at.cmp(&b.captured_at))
            .map(|s| s.doc.clone());
        debug!(found = latest.is_some(), "Snapshot LATEST");
        Ok(latest)
    }
}
