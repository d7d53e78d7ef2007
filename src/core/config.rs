use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use super::present::PresenterSettings;

pub const API_KEY_ENV: &str = "EXCHANGE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    pub fn new(from: &str, to: &str) -> Self {
        CurrencyPair {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShortlistConfig {
    #[serde(default = "default_pairs")]
    pub pairs: Vec<CurrencyPair>,
    #[serde(default = "default_reference_currencies")]
    pub reference_currencies: Vec<String>,
}

impl Default for ShortlistConfig {
    fn default() -> Self {
        ShortlistConfig {
            pairs: default_pairs(),
            reference_currencies: default_reference_currencies(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_provider_url(),
            api_key: None,
        }
    }
}

impl ProviderConfig {
    /// The configured key, or the `EXCHANGE_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |key: String| {
            let key = key.trim().to_string();
            (!key.is_empty()).then_some(key)
        };
        self.api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| std::env::var(API_KEY_ENV).ok().and_then(non_blank))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub shortlist: ShortlistConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    #[serde(default = "default_stale_after_seconds")]
    pub stale_after_seconds: u64,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            symbols: Vec::new(),
            shortlist: ShortlistConfig::default(),
            provider: ProviderConfig::default(),
            refresh_seconds: default_refresh_seconds(),
            stale_after_seconds: default_stale_after_seconds(),
            data_path: None,
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_pairs() -> Vec<CurrencyPair> {
    vec![
        CurrencyPair::new("USD", "YER"),
        CurrencyPair::new("SAR", "YER"),
        CurrencyPair::new("USD", "SAR"),
        CurrencyPair::new("YER", "USD"),
        CurrencyPair::new("YER", "SAR"),
        CurrencyPair::new("SAR", "USD"),
    ]
}

fn default_reference_currencies() -> Vec<String> {
    vec!["USD".to_string(), "SAR".to_string(), "YER".to_string()]
}

fn default_provider_url() -> String {
    "https://v6.exchangerate-api.com".to_string()
}

fn default_refresh_seconds() -> u64 {
    30
}

fn default_stale_after_seconds() -> u64 {
    900
}

/// Trims and uppercases a list of codes, dropping blanks.
fn normalize_codes(codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .collect()
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxview", "fxview")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "fxview", "fxview")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        debug!("Successfully loaded config");
        Ok(config.normalized())
    }

    /// Canonical casing for every currency code in the config.
    pub fn normalized(mut self) -> Self {
        let base = self.base_currency.trim().to_uppercase();
        self.base_currency = if base.is_empty() {
            default_base_currency()
        } else {
            base
        };
        self.symbols = normalize_codes(&self.symbols);
        self.shortlist.reference_currencies = normalize_codes(&self.shortlist.reference_currencies);
        self.shortlist.pairs = self
            .shortlist
            .pairs
            .iter()
            .map(|pair| CurrencyPair::new(&pair.from.trim().to_uppercase(), &pair.to.trim().to_uppercase()))
            .filter(|pair| !pair.from.is_empty() && !pair.to.is_empty())
            .collect();
        self
    }

    pub fn presenter_settings(&self) -> PresenterSettings {
        PresenterSettings {
            base: self.base_currency.clone(),
            symbols: self.symbols.clone(),
            pairs: self.shortlist.pairs.clone(),
            reference_currencies: self.shortlist.reference_currencies.clone(),
            stale_after: i64::try_from(self.stale_after_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: " eur "
symbols: ["usd", " sar ", ""]
shortlist:
  pairs:
    - from: usd
      to: yer
    - from: EUR
      to: ""
  reference_currencies: [eur, usd]
provider:
  base_url: "http://example.com/fx"
  api_key: "secret"
refresh_seconds: 10
stale_after_seconds: 60
data_path: "/tmp/fxview"
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.symbols, vec!["USD", "SAR"]);
        assert_eq!(config.shortlist.pairs, vec![CurrencyPair::new("USD", "YER")]);
        assert_eq!(config.shortlist.reference_currencies, vec!["EUR", "USD"]);
        assert_eq!(config.provider.base_url, "http://example.com/fx");
        assert_eq!(config.provider.resolve_api_key().as_deref(), Some("secret"));
        assert_eq!(config.refresh_seconds, 10);
        assert_eq!(config.stale_after_seconds, 60);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/fxview")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_yaml("{}").expect("Failed to deserialize");
        assert_eq!(config.base_currency, "USD");
        assert!(config.symbols.is_empty());
        assert_eq!(config.shortlist.pairs.len(), 6);
        assert_eq!(config.shortlist.pairs[0], CurrencyPair::new("USD", "YER"));
        assert_eq!(config.shortlist.pairs[5], CurrencyPair::new("SAR", "USD"));
        assert_eq!(config.shortlist.reference_currencies, vec!["USD", "SAR", "YER"]);
        assert_eq!(config.provider.base_url, "https://v6.exchangerate-api.com");
        assert_eq!(config.refresh_seconds, 30);
        assert_eq!(config.stale_after_seconds, 900);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_presenter_settings() {
        let config = AppConfig::from_yaml("symbols: [eur]\nstale_after_seconds: 120").unwrap();
        let settings = config.presenter_settings();
        assert_eq!(settings.symbols, vec!["EUR"]);
        assert_eq!(settings.pairs.len(), 6);
        assert_eq!(settings.stale_after, Duration::minutes(2));
        assert_eq!(settings.base, "USD");
    }

    #[test]
    fn test_huge_stale_after_saturates() {
        for yaml in [
            "stale_after_seconds: 10000000000000000",
            "stale_after_seconds: 18446744073709551615",
        ] {
            let settings = AppConfig::from_yaml(yaml).unwrap().presenter_settings();
            assert_eq!(settings.stale_after, Duration::MAX);
        }
    }
}
