// dqscore-core/src/error.rs

use crate::domain::error::DomainError;
use crate::domain::run::Stage;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DqError {
    // --- ERREURS DU DOMAINE (Configuration, Invariants) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (DuckDB, IO, Parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- ERREURS DE PIPELINE ---
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<DqError>,
    },

    // --- ERREURS GÉNÉRIQUES / APPLICATIVES ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl DqError {
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            // Keep the innermost stage
            DqError::StageFailed { .. } => self,
            other => DqError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that failed, if this error came out of the pipeline.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            DqError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

// Manual implementations to avoid duplicate enum variants but keep ergonomics
impl From<std::io::Error> for DqError {
    fn from(err: std::io::Error) -> Self {
        DqError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for DqError {
    fn from(err: duckdb::Error) -> Self {
        DqError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(err)))
    }
}
