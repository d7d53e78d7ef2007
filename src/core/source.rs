//! Rate ingestion abstractions

use anyhow::Result;
use async_trait::async_trait;

use super::rates::RawDocument;

/// Produces a fresh snapshot document quoted against `base`.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_snapshot(&self, base: &str, symbols: &[String]) -> Result<RawDocument>;
}
