//! Turns raw snapshot documents into a canonical rate map.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::trace;

use super::rates::{CanonicalRateMap, RATES_FIELD, RawDocument, TIMESTAMP_FIELD, TS_FIELD};

/// Fields of a legacy flat document that are never rates, even when numeric.
const RESERVED_FLAT_KEYS: [&str; 3] = [TS_FIELD, TIMESTAMP_FIELD, "_id"];

/// The two document layouts ingestion has produced over time.
#[derive(Debug, PartialEq)]
pub enum DocumentShape<'a> {
    /// Rates under a `rates` object.
    Nested(&'a Map<String, Value>),
    /// Legacy layout with rates inlined at the top level.
    Flat(&'a Map<String, Value>),
}

impl<'a> DocumentShape<'a> {
    pub fn detect(doc: &'a RawDocument) -> Self {
        match doc.get(RATES_FIELD) {
            Some(Value::Object(rates)) if !rates.is_empty() => DocumentShape::Nested(rates),
            _ => DocumentShape::Flat(doc),
        }
    }

    fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        let (map, skip_reserved) = match *self {
            DocumentShape::Nested(map) => (map, false),
            DocumentShape::Flat(map) => (map, true),
        };
        map.iter()
            .filter(move |(key, _)| !(skip_reserved && RESERVED_FLAT_KEYS.contains(&key.as_str())))
    }
}

/// Cleans a raw document into uppercase codes mapped to finite rates.
///
/// Non-numeric entries are dropped. When several keys differ only by case,
/// an already uppercase key wins; otherwise the last one in document order
/// does.
pub fn normalize(doc: &RawDocument) -> CanonicalRateMap {
    let shape = DocumentShape::detect(doc);
    let mut rates = CanonicalRateMap::new();
    let mut exact = HashSet::new();

    for (key, value) in shape.entries() {
        let Some(rate) = numeric_rate(value) else {
            trace!(key = %key, "Dropping non-numeric rate entry");
            continue;
        };

        let code = key.trim().to_uppercase();
        if code.is_empty() {
            continue;
        }

        let is_exact = key.trim() == code;
        if exact.contains(&code) && !is_exact {
            trace!(key = %key, "Ignoring case variant of an uppercase code");
            continue;
        }
        if is_exact {
            exact.insert(code.clone());
        }
        rates.insert(code, rate);
    }

    rates
}

fn numeric_rate(value: &Value) -> Option<f64> {
    value.as_f64().filter(|rate| rate.is_finite())
}
