//! Snapshot persistence abstractions

use anyhow::Result;
use async_trait::async_trait;

use super::rates::RawDocument;

/// Append-only storage of raw rate snapshot documents.
///
/// Documents are never updated once inserted. `latest` returns the one with
/// the most recent capture timestamp, ties going to the last inserted.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert(&self, doc: RawDocument) -> Result<()>;

    async fn latest(&self) -> Result<Option<RawDocument>>;
}
