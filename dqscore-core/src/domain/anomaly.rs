// dqscore-core/src/domain/anomaly.rs

use serde::{Deserialize, Serialize};

use crate::domain::detection::explanation::explain;
use crate::domain::detection::{AnomalyCandidate, ClassifiedAnomaly};
use crate::domain::dimension::Dimension;
use crate::domain::metric::MetricKey;
use crate::domain::run::RunScope;
use crate::domain::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnomalyStatus {
    Open,
}

impl AnomalyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
        }
    }
}

/// A classified finding, ready to be upserted on
/// (run_date, dataset_id, dimension, table, column, metric_name).
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyObservation {
    pub scope: RunScope,
    pub dimension: Dimension,
    pub key: MetricKey,
    pub severity: Severity,
    pub deviation_percent: Option<f64>,
    pub baseline_value: Option<f64>,
    pub current_value: Option<f64>,
    pub z_score: Option<f64>,
    pub explanation: String,
}

impl AnomalyObservation {
    pub fn new(scope: RunScope, candidate: &AnomalyCandidate, classified: ClassifiedAnomaly) -> Self {
        let explanation = explain(
            candidate.dimension,
            &candidate.key.table,
            &candidate.key.column,
            classified.current_value,
            classified.baseline_value,
        );
        Self {
            scope,
            dimension: candidate.dimension,
            key: candidate.key.clone(),
            severity: classified.severity,
            deviation_percent: classified.deviation_percent,
            baseline_value: classified.baseline_value,
            current_value: classified.current_value,
            z_score: classified.z_score,
            explanation,
        }
    }
}

/// Stored anomaly row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub dataset_id: i64,
    pub run_date: chrono::NaiveDate,
    pub dimension: Dimension,
    pub key: MetricKey,
    pub severity: Severity,
    pub deviation_percent: Option<f64>,
    pub baseline_value: Option<f64>,
    pub current_value: Option<f64>,
    pub z_score: Option<f64>,
    /// Number of times this key has been observed. Never decreases.
    pub persistence: i64,
    pub status: AnomalyStatus,
    pub explanation: String,
    pub created_at: String,
    pub updated_at: String,
}
