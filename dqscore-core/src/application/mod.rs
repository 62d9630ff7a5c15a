// dqscore-core/src/application/mod.rs

pub mod aggregation;
pub mod alerting;
pub mod baseline_audit;
pub mod classification;
pub mod comparison;
pub mod detectors;
pub mod engine;
pub mod pipeline;
pub mod registry;
pub mod root_cause;
pub mod scoring;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Cela permet au CLI de faire :
// `use dqscore_core::application::{run_quality_pipeline, register_dataset};`
// sans avoir à connaître la structure interne des fichiers.

pub use baseline_audit::audit_baseline;
pub use detectors::{Detector, default_detectors};
pub use engine::{StageContext, run_stage};
pub use pipeline::{PipelineOptions, RunReport, run_quality_pipeline};
pub use registry::{register_dataset, resolve_datasets};
