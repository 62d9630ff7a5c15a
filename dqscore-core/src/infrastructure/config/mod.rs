// dqscore-core/src/infrastructure/config/mod.rs

pub mod thresholds;

pub use thresholds::{load_quality_config, load_thresholds, resolve_config_path};
