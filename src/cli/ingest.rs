use super::ui;
use crate::core::config::AppConfig;
use crate::core::rates::{RATES_FIELD, RawDocument, TS_FIELD};
use crate::core::{RateSource, SnapshotStore};
use anyhow::Result;
use std::time::Duration;
use tracing::{error, info};

/// Fetches one snapshot and appends it to the store.
pub async fn ingest_once(
    source: &dyn RateSource,
    store: &dyn SnapshotStore,
    config: &AppConfig,
) -> Result<RawDocument> {
    let doc = source
        .fetch_snapshot(&config.base_currency, &config.symbols)
        .await?;
    store.insert(doc.clone()).await?;
    info!(base = %config.base_currency, "Inserted snapshot");
    Ok(doc)
}

fn describe(doc: &RawDocument) -> String {
    let ts = doc.get(TS_FIELD).and_then(|v| v.as_str()).unwrap_or("unknown");
    let count = doc
        .get(RATES_FIELD)
        .and_then(|v| v.as_object())
        .map_or(0, |rates| rates.len());
    format!("[ingest] inserted {count} rates at {ts}")
}

/// Ingests every `every` until the task is cancelled. Failures are logged
/// and the loop carries on with the next tick.
pub async fn run_loop(
    source: &dyn RateSource,
    store: &dyn SnapshotStore,
    config: &AppConfig,
    every: Duration,
    verbose_output: bool,
) -> Result<()> {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match ingest_once(source, store, config).await {
            Ok(doc) => {
                if verbose_output {
                    println!("{}", describe(&doc));
                }
            }
            Err(e) => error!(error = %e, "Ingestion failed"),
        }
    }
}

pub async fn run(
    source: &dyn RateSource,
    store: &dyn SnapshotStore,
    config: &AppConfig,
    repeat: bool,
    every: Duration,
) -> Result<()> {
    if repeat {
        println!(
            "{}",
            ui::style_text(
                &format!("[ingest] fetching every {}s", every.as_secs()),
                ui::StyleType::Subtle
            )
        );
        return run_loop(source, store, config, every, true).await;
    }

    let pb = ui::new_spinner("Fetching latest rates...");
    let result = ingest_once(source, store, config).await;
    pb.finish_and_clear();

    let doc = result?;
    println!("{}", ui::style_text(&describe(&doc), ui::StyleType::Success));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RateSource for MockSource {
        async fn fetch_snapshot(&self, base: &str, symbols: &[String]) -> Result<RawDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("provider down"));
            }
            Ok(json!({
                "base": base,
                "symbols": symbols,
                "rates": {"USD": 1.0, "SAR": 3.75},
                "ts": "2026-10-19T10:00:00.000Z"
            })
            .as_object()
            .cloned()
            .unwrap())
        }
    }

    #[tokio::test]
    async fn test_ingest_once_appends_snapshot() {
        let source = MockSource {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let store = MemorySnapshotStore::new();
        let config = AppConfig::from_yaml("symbols: [sar]").unwrap();

        let doc = ingest_once(&source, &store, &config).await.unwrap();
        assert_eq!(doc["symbols"], json!(["SAR"]));
        assert_eq!(store.len().await, 1);
        assert_eq!(
            describe(&doc),
            "[ingest] inserted 2 rates at 2026-10-19T10:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_stores_nothing() {
        let source = MockSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let store = MemorySnapshotStore::new();
        let config = AppConfig::default();

        let result = run(&source, &store, &config, false, Duration::from_secs(1)).await;
        assert_eq!(result.unwrap_err().to_string(), "provider down");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_loop_survives_failures() {
        let source = MockSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let store = MemorySnapshotStore::new();
        let config = AppConfig::default();

        let _ = tokio::time::timeout(
            Duration::from_millis(50),
            run_loop(&source, &store, &config, Duration::from_millis(5), false),
        )
        .await;
        assert!(source.calls.load(Ordering::SeqCst) > 1);
    }
}
