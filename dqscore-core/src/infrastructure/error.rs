// dqscore-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(dqscore::infra::database::duckdb),
        help("An error occurred inside the quality store. Check the --db-path file is not locked by another process.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("Stored value for {column} could not be read: '{value}'")]
    #[diagnostic(
        code(dqscore::infra::database::decode),
        help("The row was written by another tool with an unexpected format.")
    )]
    Decode { column: String, value: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(dqscore::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(dqscore::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Thresholds configuration not found at '{0}'")]
    #[diagnostic(
        code(dqscore::infra::config_missing),
        help("Pass --config, set DQ_CONFIG_PATH, or create dq_thresholds.yaml in the working directory.")
    )]
    ConfigNotFound(String),

    // --- EXPORTS ---
    #[error("CSV Export Error: {0}")]
    #[diagnostic(code(dqscore::infra::csv))]
    CsvError(#[from] csv::Error),

    #[error("JSON Serialization Error: {0}")]
    #[diagnostic(code(dqscore::infra::json))]
    JsonError(#[from] serde_json::Error),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
