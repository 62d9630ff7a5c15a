// dqscore-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration Error: {0}")]
    #[diagnostic(
        code(dqscore::domain::configuration),
        help("Check dimension weights, severity penalties and alert thresholds in dq_thresholds.yaml.")
    )]
    ConfigurationError(String),

    #[error("Invariant violated: {0}")]
    #[diagnostic(
        code(dqscore::domain::invariant),
        help("Stored data does not match the quality model. Fix the upstream feed instead of coercing it.")
    )]
    InvariantViolation(String),

    #[error("Malformed foreign key '{relationship}': {reason}")]
    #[diagnostic(code(dqscore::domain::foreign_key))]
    MalformedForeignKey {
        relationship: String,
        reason: String,
    },

    #[error("No data available: {0}")]
    #[diagnostic(code(dqscore::domain::data_unavailable))]
    DataUnavailable(String),
}
