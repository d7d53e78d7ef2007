use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::rates::{BASE_FIELD, RATES_FIELD, RawDocument, SYMBOLS_FIELD, TS_FIELD};
use crate::core::source::RateSource;
use crate::providers::util::with_retry;

const RETRIES: usize = 2;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Client for the exchangerate-api.com v6 "latest" endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxview/0.1")
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    base_code: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

/// Keeps the requested symbols (all of them when none are requested) and
/// records the base at 1.0.
fn select_rates(
    all_rates: &HashMap<String, f64>,
    base: &str,
    symbols: &[String],
) -> BTreeMap<String, f64> {
    let mut rates: BTreeMap<String, f64> = if symbols.is_empty() {
        all_rates
            .iter()
            .map(|(code, rate)| (code.to_uppercase(), *rate))
            .collect()
    } else {
        symbols
            .iter()
            .filter_map(|symbol| match all_rates.get(symbol) {
                Some(rate) => Some((symbol.clone(), *rate)),
                None => {
                    warn!(%symbol, "Provider returned no rate for symbol");
                    None
                }
            })
            .collect()
    };
    rates.insert(base.to_string(), 1.0);
    rates
}

#[async_trait]
impl RateSource for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip_all, fields(base = %base))]
    async fn fetch_snapshot(&self, base: &str, symbols: &[String]) -> Result<RawDocument> {
        let base = base.trim().to_uppercase();
        let url = format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, base);
        debug!("Requesting latest rates from {}/v6/***/latest/{}", self.base_url, base);

        let response = with_retry(|| self.client.get(&url).send(), RETRIES, RETRY_DELAY)
            .await
            .with_context(|| format!("Request error for base currency: {base}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rate response for {}: {}", base, e))?;

        if data.result != "success" {
            return Err(anyhow!(
                "Rate API error for {}: {}",
                base,
                data.error_type.as_deref().unwrap_or(&data.result)
            ));
        }
        if let Some(code) = data.base_code.as_deref() {
            if !code.eq_ignore_ascii_case(&base) {
                return Err(anyhow!("Rate API answered for {} instead of {}", code, base));
            }
        }

        let rates = select_rates(&data.conversion_rates, &base, symbols);
        let symbols: Vec<Value> = if symbols.is_empty() {
            rates.keys().map(|code| json!(code)).collect()
        } else {
            symbols.iter().map(|code| json!(code)).collect()
        };
        debug!(count = rates.len(), "Received rates");

        let mut doc = RawDocument::new();
        doc.insert(BASE_FIELD.to_string(), json!(base));
        doc.insert(SYMBOLS_FIELD.to_string(), Value::Array(symbols));
        doc.insert(RATES_FIELD.to_string(), json!(rates));
        doc.insert(
            TS_FIELD.to_string(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Ok(doc)
    }
}
