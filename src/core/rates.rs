//! Rate snapshot types shared by the store, the normalizer and the presenter.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::normalize::normalize;

/// A loosely typed snapshot document as written by ingestion.
pub type RawDocument = Map<String, Value>;

/// Currency code to "units of that currency per 1 unit of base".
pub type CanonicalRateMap = BTreeMap<String, f64>;

/// Field names used by the snapshot document layout.
pub const BASE_FIELD: &str = "base";
pub const SYMBOLS_FIELD: &str = "symbols";
pub const RATES_FIELD: &str = "rates";
pub const TS_FIELD: &str = "ts";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One immutable, cleaned capture of rates against a single base.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base: String,
    pub rates: CanonicalRateMap,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    /// Builds a snapshot from a raw document.
    ///
    /// The document's own `base` is authoritative. Legacy documents without
    /// one are assumed to be quoted against `fallback_base`.
    pub fn from_document(doc: &RawDocument, fallback_base: &str) -> Self {
        let base = doc
            .get(BASE_FIELD)
            .and_then(Value::as_str)
            .map(|b| b.trim().to_uppercase())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| fallback_base.trim().to_uppercase());

        Self {
            base,
            rates: normalize(doc),
            timestamp: document_timestamp(doc),
        }
    }

    /// Rate of `symbol` against the base. An explicit entry wins over the
    /// implicit 1.0 of the base itself.
    pub fn rate_of(&self, symbol: &str) -> Option<f64> {
        let symbol = symbol.to_uppercase();
        match self.rates.get(&symbol) {
            Some(rate) => Some(*rate),
            None if symbol == self.base => Some(1.0),
            None => None,
        }
    }
}

/// Reads the capture time from `ts` or `timestamp`, accepting RFC 3339
/// strings or epoch seconds.
pub fn document_timestamp(doc: &RawDocument) -> Option<DateTime<Utc>> {
    [TS_FIELD, TIMESTAMP_FIELD]
        .iter()
        .filter_map(|field| doc.get(*field))
        .find_map(parse_timestamp)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}
