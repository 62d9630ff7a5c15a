// dqscore-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod sinks;

pub use self::duckdb::DuckDBStore;
pub use sinks::{JsonLinesAlertSink, TracingAlertSink};
