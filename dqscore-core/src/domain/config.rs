// dqscore-core/src/domain/config.rs
//
// Scoring configuration lifecycle: load (infrastructure) -> validate -> freeze.
// `ThresholdsFile` mirrors dq_thresholds.yaml; `QualityConfig` is the frozen,
// typed value handed to every stage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::domain::dimension::Dimension;
use crate::domain::error::DomainError;
use crate::domain::severity::Severity;

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[validate(schema(function = "validate_scores"))]
pub struct ThresholdsFile {
    #[validate(custom(function = "validate_dimensions"))]
    pub dimensions: HashMap<String, DimensionSettings>,

    #[validate(custom(function = "validate_penalties"))]
    pub severity_penalty: HashMap<String, f64>,

    #[validate(nested)]
    pub alerts: AlertThresholds,

    #[serde(default)]
    #[validate(nested)]
    pub baseline: BaselineSettings,

    #[serde(default)]
    #[validate(nested)]
    pub noise: NoiseSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct DimensionSettings {
    /// Maximum deduction one (dimension, table) row can cause.
    pub weight: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Validate)]
pub struct AlertThresholds {
    #[validate(range(min = 0.0, max = 100.0))]
    pub warning_score: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub critical_score: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Validate)]
pub struct BaselineSettings {
    #[validate(range(min = 1, max = 3650))]
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Validate)]
pub struct NoiseSettings {
    /// Distribution candidates with a flatter baseline are ignored.
    #[validate(range(min = 0.0))]
    #[serde(default = "default_min_std_dev")]
    pub min_std_dev: f64,

    /// Distribution candidates moving less than this (in percent) are ignored.
    #[validate(range(min = 0.0))]
    #[serde(default = "default_min_change_pct")]
    pub min_change_pct: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            min_std_dev: default_min_std_dev(),
            min_change_pct: default_min_change_pct(),
        }
    }
}

fn default_window_days() -> u32 {
    30
}
fn default_min_std_dev() -> f64 {
    1e-3
}
fn default_min_change_pct() -> f64 {
    0.1
}

fn validate_dimensions(dims: &HashMap<String, DimensionSettings>) -> Result<(), ValidationError> {
    if dims.is_empty() {
        return Err(ValidationError::new("no_dimension_weights"));
    }
    for (name, settings) in dims {
        if Dimension::from_str(name).is_err() {
            return Err(ValidationError::new("unknown_dimension"));
        }
        if !settings.weight.is_finite() || settings.weight < 0.0 {
            return Err(ValidationError::new("negative_dimension_weight"));
        }
    }
    Ok(())
}

fn validate_penalties(penalties: &HashMap<String, f64>) -> Result<(), ValidationError> {
    for severity in Severity::ALL {
        let found = penalties
            .iter()
            .find(|(label, _)| Severity::from_str(label).ok() == Some(severity));
        match found {
            None => return Err(ValidationError::new("missing_severity_penalty")),
            Some((_, value)) if !value.is_finite() || *value < 0.0 => {
                return Err(ValidationError::new("negative_severity_penalty"));
            }
            Some(_) => {}
        }
    }
    if penalties.keys().any(|label| Severity::from_str(label).is_err()) {
        return Err(ValidationError::new("unknown_severity"));
    }
    Ok(())
}

/// `range` lets NaN through, and `score < NaN` never alerts.
fn validate_scores(file: &ThresholdsFile) -> Result<(), ValidationError> {
    let scores = [
        file.alerts.warning_score,
        file.alerts.critical_score,
        file.noise.min_std_dev,
        file.noise.min_change_pct,
    ];
    if scores.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::new("non_finite_threshold"));
    }
    if file.alerts.critical_score > file.alerts.warning_score {
        return Err(ValidationError::new("critical_above_warning"));
    }
    Ok(())
}

impl ThresholdsFile {
    /// The thresholds shipped with the project template.
    pub fn recommended() -> Self {
        let dimensions = [
            ("completeness", 25.0),
            ("volume", 20.0),
            ("distribution", 20.0),
            ("schema", 20.0),
            ("referential", 15.0),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), DimensionSettings { weight }))
        .collect();

        let severity_penalty = [("LOW", 5.0), ("MEDIUM", 10.0), ("HIGH", 15.0)]
            .into_iter()
            .map(|(label, value)| (label.to_string(), value))
            .collect();

        Self {
            dimensions,
            severity_penalty,
            alerts: AlertThresholds {
                warning_score: 90.0,
                critical_score: 70.0,
            },
            baseline: BaselineSettings::default(),
            noise: NoiseSettings::default(),
        }
    }
}

// "volume" and "Volume" parse to the same key
fn duplicate_key(kind: &str, key: &str) -> DomainError {
    DomainError::ConfigurationError(format!(
        "{} '{}' is configured more than once (keys are case-insensitive)",
        kind, key
    ))
}

/// Immutable scoring configuration, shared by every stage of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    weights: BTreeMap<Dimension, f64>,
    penalties: BTreeMap<Severity, f64>,
    alerts: AlertThresholds,
    baseline: BaselineSettings,
    noise: NoiseSettings,
}

impl QualityConfig {
    /// Validates the raw file and freezes it into typed lookups.
    pub fn freeze(file: ThresholdsFile) -> Result<Self, DomainError> {
        file.validate()
            .map_err(|e| DomainError::ConfigurationError(e.to_string()))?;

        let mut weights = BTreeMap::new();
        for (name, settings) in &file.dimensions {
            let dimension = Dimension::from_str(name)?;
            if weights.insert(dimension, settings.weight).is_some() {
                return Err(duplicate_key("dimension", dimension.as_str()));
            }
        }

        let mut penalties = BTreeMap::new();
        for (label, value) in &file.severity_penalty {
            let severity = Severity::from_str(label)?;
            if penalties.insert(severity, *value).is_some() {
                return Err(duplicate_key("severity penalty", severity.as_str()));
            }
        }

        Ok(Self {
            weights,
            penalties,
            alerts: file.alerts,
            baseline: file.baseline,
            noise: file.noise,
        })
    }

    /// Dimensions without a configured weight cannot deduct anything.
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.weights.get(&dimension).copied().unwrap_or(0.0)
    }

    pub fn base_penalty(&self, severity: Severity) -> f64 {
        self.penalties.get(&severity).copied().unwrap_or(0.0)
    }

    pub fn alerts(&self) -> &AlertThresholds {
        &self.alerts
    }

    pub fn baseline_window_days(&self) -> u32 {
        self.baseline.window_days
    }

    pub fn noise(&self) -> &NoiseSettings {
        &self.noise
    }

    pub fn weights(&self) -> &BTreeMap<Dimension, f64> {
        &self.weights
    }
}
