pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::Result;
pub use disk::DiskSnapshotStore;
pub use memory::MemorySnapshotStore;
use std::sync::Arc;

/// Opens the on-disk snapshot store under the configured data path.
pub fn open_default(config: &AppConfig) -> Result<Arc<DiskSnapshotStore>> {
    let path = config.default_data_path()?.join("snapshots");
    Ok(Arc::new(DiskSnapshotStore::open(&path)?))
}
