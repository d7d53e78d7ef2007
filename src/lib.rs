pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{RateSource, SnapshotStore};
use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch rates and append a snapshot.
    Ingest { repeat: bool, seconds: u64 },
    /// Render the latest snapshot once.
    Show,
    /// Convert an amount with the latest snapshot.
    Convert {
        amount: f64,
        from: Option<String>,
        to: Option<String>,
    },
    /// Re-render on a timer, optionally ingesting in the same process.
    Watch { ingest_seconds: Option<u64> },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => {
            let path = AppConfig::default_config_path()?;
            if path.exists() {
                AppConfig::load()
            } else {
                debug!("No config at {}, using defaults", path.display());
                Ok(AppConfig::default())
            }
        }
    }
}

fn rate_source(config: &AppConfig) -> Result<Arc<dyn RateSource>> {
    let Some(api_key) = config.provider.resolve_api_key() else {
        bail!(
            "Missing API key: set provider.api_key in the config or the {} environment variable",
            crate::core::config::API_KEY_ENV
        );
    };
    Ok(Arc::new(providers::ExchangeRateApiProvider::new(
        &config.provider.base_url,
        &api_key,
    )?))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxview starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let store: Arc<dyn SnapshotStore> = store::open_default(&config)?;
    run_with_store(command, &config, store).await
}

/// Runs a command against an already constructed store.
pub async fn run_with_store(
    command: AppCommand,
    config: &AppConfig,
    store: Arc<dyn SnapshotStore>,
) -> Result<()> {
    match command {
        AppCommand::Ingest { repeat, seconds } => {
            let source = rate_source(config)?;
            cli::ingest::run(
                source.as_ref(),
                store.as_ref(),
                config,
                repeat,
                Duration::from_secs(seconds.max(1)),
            )
            .await
        }
        AppCommand::Show => cli::rates::show(store.as_ref(), config).await,
        AppCommand::Convert { amount, from, to } => {
            cli::rates::convert(
                store.as_ref(),
                config,
                amount,
                from.as_deref(),
                to.as_deref(),
            )
            .await
        }
        AppCommand::Watch { ingest_seconds } => {
            let source = match ingest_seconds {
                Some(seconds) => Some((rate_source(config)?, Duration::from_secs(seconds.max(1)))),
                None => None,
            };
            cli::rates::watch(store, config, source).await
        }
    }
}
