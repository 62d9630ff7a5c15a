// dqscore-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod fs;

// Re-export specific adapters for cleaner imports elsewhere
pub use adapters::{DuckDBStore, JsonLinesAlertSink, TracingAlertSink};
pub use config::load_quality_config;
