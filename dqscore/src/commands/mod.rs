// dqscore/src/commands/mod.rs

pub mod anomalies;
pub mod baseline_audit;
pub mod check_config;
pub mod register;
pub mod run;
pub mod scores;

use anyhow::Context;
use std::path::Path;

use dqscore_core::infrastructure::adapters::duckdb::DuckDBStore;

/// Read-only commands refuse to create an empty database by accident.
pub(crate) fn open_existing_store(db_path: &str) -> anyhow::Result<DuckDBStore> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "❌ Database not found at: {}\n👉 Have you run 'dqscore run'?",
            db_path
        );
    }
    open_store(db_path)
}

pub(crate) fn open_store(db_path: &str) -> anyhow::Result<DuckDBStore> {
    DuckDBStore::new(db_path).with_context(|| format!("Failed to initialize DuckDB at {}", db_path))
}
