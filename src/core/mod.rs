//! Core business logic abstractions

pub mod config;
pub mod convert;
pub mod log;
pub mod normalize;
pub mod present;
pub mod rates;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use convert::{convert, safe_div, unit_rate};
pub use normalize::normalize;
pub use rates::{CanonicalRateMap, RateSnapshot, RawDocument};
pub use source::RateSource;
pub use store::SnapshotStore;
