//! Builds the rate views shown to the user from one snapshot.
//!
//! Everything here returns plain data. Rendering lives in `cli`.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

use super::config::CurrencyPair;
use super::convert::{convert, unit_rate};
use super::rates::RateSnapshot;

/// Rendered in place of any value that could not be computed.
pub const PLACEHOLDER: &str = "—";
/// Precision of the "X = Y" conversion statement.
pub const HEADLINE_DECIMALS: usize = 2;
/// Precision of unit-rate table cells.
pub const TABLE_DECIMALS: usize = 4;

const TIMESTAMP_FORMAT: &str = "%H:%M:%S %d-%m-%Y UTC";

/// Inputs of the presenter that come from configuration.
#[derive(Debug, Clone)]
pub struct PresenterSettings {
    /// Configured base, offered for conversion even when a snapshot is
    /// quoted against another one.
    pub base: String,
    pub symbols: Vec<String>,
    pub pairs: Vec<CurrencyPair>,
    pub reference_currencies: Vec<String>,
    pub stale_after: Duration,
}

/// One line of the quick-reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortlistRow {
    pub from: String,
    pub to: String,
    /// One unit of `from` in `to`.
    pub rate: Option<f64>,
    /// One unit of `from` in each reference currency, in configured order.
    pub references: Vec<(String, Option<f64>)>,
}

/// One line of the full rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct FullRow {
    pub base: String,
    pub symbol: String,
    pub rate: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Result of a user conversion request.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Converted {
        amount: f64,
        from: String,
        to: String,
        result: f64,
        base: String,
    },
    NotComputable {
        amount: f64,
        from: String,
        to: String,
    },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }

    /// Single line statement of the outcome.
    pub fn headline(&self) -> String {
        match self {
            ConversionOutcome::Converted {
                amount,
                from,
                to,
                result,
                base,
            } => format!(
                "{} {from} = {} {to}  (rate derived from {base})",
                fmt(Some(*amount), HEADLINE_DECIMALS),
                fmt(Some(*result), HEADLINE_DECIMALS),
            ),
            ConversionOutcome::NotComputable { from, to, .. } => {
                format!("Cannot convert {from} to {to} with the current data.")
            }
        }
    }
}

/// How old a snapshot is relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotAge {
    pub age: Option<Duration>,
    pub stale: bool,
}

impl SnapshotAge {
    pub fn describe(&self) -> String {
        match self.age {
            None => "age unknown".to_string(),
            Some(age) => {
                let secs = age.num_seconds().max(0);
                let text = match secs {
                    0..=59 => format!("{secs}s ago"),
                    60..=3599 => format!("{}m ago", secs / 60),
                    3600..=86_399 => format!("{}h ago", secs / 3600),
                    _ => format!("{}d ago", secs / 86_400),
                };
                if self.stale {
                    format!("{text}, stale")
                } else {
                    text
                }
            }
        }
    }
}

/// Everything one render cycle shows, derived from a single snapshot.
#[derive(Debug, Clone)]
pub struct RateView {
    pub snapshot: RateSnapshot,
    pub updated_at: String,
    pub age: SnapshotAge,
    pub shortlist: Vec<ShortlistRow>,
    pub full: Vec<FullRow>,
    pub known: Vec<String>,
}

impl RateView {
    pub fn build(snapshot: RateSnapshot, settings: &PresenterSettings, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: format_timestamp(snapshot.timestamp),
            age: snapshot_age(&snapshot, now, settings.stale_after),
            shortlist: shortlist_table(
                &snapshot,
                &settings.pairs,
                &settings.reference_currencies,
            ),
            full: full_table(&snapshot),
            known: known_currencies(&snapshot, &settings.base, &settings.symbols),
            snapshot,
        }
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> ConversionOutcome {
        conversion(&self.snapshot, amount, from, to)
    }
}

/// Formats a value with thousands separators and fixed decimals.
///
/// Missing and non-finite values render as [`PLACEHOLDER`].
pub fn fmt(value: Option<f64>, decimals: usize) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_string();
    };

    let digits = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "unknown".to_string(),
        |ts| ts.format(TIMESTAMP_FORMAT).to_string(),
    )
}

pub fn snapshot_age(snapshot: &RateSnapshot, now: DateTime<Utc>, stale_after: Duration) -> SnapshotAge {
    let age = snapshot.timestamp.map(|ts| now - ts);
    SnapshotAge {
        age,
        stale: age.is_some_and(|age| age > stale_after),
    }
}

pub fn shortlist_table(
    snapshot: &RateSnapshot,
    pairs: &[CurrencyPair],
    reference_currencies: &[String],
) -> Vec<ShortlistRow> {
    let base = &snapshot.base;
    let rates = &snapshot.rates;

    pairs
        .iter()
        .map(|pair| ShortlistRow {
            from: pair.from.clone(),
            to: pair.to.clone(),
            rate: unit_rate(&pair.from, &pair.to, base, rates),
            references: reference_currencies
                .iter()
                .map(|reference| {
                    (
                        reference.clone(),
                        unit_rate(&pair.from, reference, base, rates),
                    )
                })
                .collect(),
        })
        .collect()
}

/// All rates of the snapshot plus the base itself, sorted by symbol.
pub fn full_table(snapshot: &RateSnapshot) -> Vec<FullRow> {
    let mut symbols: BTreeSet<&str> = snapshot.rates.keys().map(String::as_str).collect();
    symbols.insert(snapshot.base.as_str());

    symbols
        .into_iter()
        .filter_map(|symbol| {
            snapshot.rate_of(symbol).map(|rate| FullRow {
                base: snapshot.base.clone(),
                symbol: symbol.to_string(),
                rate,
                timestamp: snapshot.timestamp,
            })
        })
        .collect()
}

pub fn conversion(snapshot: &RateSnapshot, amount: f64, from: &str, to: &str) -> ConversionOutcome {
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();
    match convert(amount, &from, &to, &snapshot.base, &snapshot.rates) {
        Some(result) => ConversionOutcome::Converted {
            amount,
            from,
            to,
            result,
            base: snapshot.base.clone(),
        },
        None => ConversionOutcome::NotComputable { amount, from, to },
    }
}

/// Codes a user may pick from: the snapshot's codes, its base, the
/// configured base and the configured symbols, whether or not they
/// currently have a rate.
pub fn known_currencies(
    snapshot: &RateSnapshot,
    configured_base: &str,
    symbols: &[String],
) -> Vec<String> {
    let mut known: BTreeSet<String> = snapshot.rates.keys().cloned().collect();
    known.insert(snapshot.base.clone());
    known.extend(
        std::iter::once(configured_base)
            .chain(symbols.iter().map(String::as_str))
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty()),
    );
    known.into_iter().collect()
}

/// Picks the base as the source when known, and the first other code as the
/// target.
pub fn default_selection(known: &[String], base: &str) -> (Option<String>, Option<String>) {
    let from = known
        .iter()
        .find(|code| code.as_str() == base)
        .or_else(|| known.first())
        .cloned();
    let to = known
        .iter()
        .find(|code| Some(*code) != from.as_ref())
        .cloned();
    (from, to)
}
