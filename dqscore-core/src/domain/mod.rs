// dqscore-core/src/domain/mod.rs
//
// Pure scoring rules. Nothing in here touches storage or the clock.

pub mod aggregation;
pub mod alert;
pub mod anomaly;
pub mod baseline_audit;
pub mod comparison;
pub mod config;
pub mod detection;
pub mod dimension;
pub mod error;
pub mod metric;
pub mod root_cause;
pub mod run;
pub mod scoring;
pub mod severity;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use dimension::Dimension;
pub use error::DomainError;
pub use metric::MetricKey;
pub use run::{RunScope, Stage};
pub use severity::Severity;
