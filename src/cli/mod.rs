pub mod ingest;
pub mod rates;
pub mod setup;
pub mod ui;
