// dqscore-core/src/domain/detection/mod.rs
//
// Every detector (comparison, schema drift, referential drift) normalizes its
// findings into an `AnomalyCandidate`. Candidates all go through the same
// classifier and the same upsert path.

pub mod classifier;
pub mod explanation;
pub mod referential;
pub mod schema;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::comparison::{ComparisonResult, ComparisonStatus};
use crate::domain::dimension::Dimension;
use crate::domain::metric::MetricKey;
use crate::domain::severity::Severity;

pub use classifier::{AnomalyClassifier, Classification, ClassifiedAnomaly, NoiseFilter};
pub use referential::{ForeignKeyRelationship, ForeignKeyValidator};
pub use schema::{SchemaChange, SchemaColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Comparison,
    SchemaDrift,
    ReferentialDrift,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comparison => "comparison",
            Self::SchemaDrift => "schema_drift",
            Self::ReferentialDrift => "referential_drift",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a detector observed, before any severity is assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A metric compared against its baseline.
    Deviation {
        baseline_mean: f64,
        baseline_std: f64,
        current: f64,
        percentage_deviation: Option<f64>,
        z_score: f64,
    },
    /// Severity fixed by the kind of change (schema drift).
    Categorical { severity: Severity, change: SchemaChange },
    /// Fraction of child rows without a parent row.
    ViolationRate { rate: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyCandidate {
    pub source: DetectorKind,
    pub dimension: Dimension,
    pub key: MetricKey,
    pub signal: Signal,
}

/// Comparison detector: every compared metric is a candidate, its dimension
/// inferred from the metric name. NEW_METRIC rows carry no deviation.
pub fn from_comparisons(results: &[ComparisonResult]) -> Vec<AnomalyCandidate> {
    results
        .iter()
        .filter(|r| r.status == ComparisonStatus::Ok)
        .filter_map(|r| {
            let baseline_mean = r.baseline_mean?;
            Some(AnomalyCandidate {
                source: DetectorKind::Comparison,
                dimension: Dimension::infer(&r.key.metric_name),
                key: r.key.clone(),
                signal: Signal::Deviation {
                    baseline_mean,
                    baseline_std: r.baseline_std.unwrap_or(0.0),
                    current: r.current_value,
                    percentage_deviation: r.percentage_deviation,
                    z_score: r.z_score.unwrap_or(0.0),
                },
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::comparison::ComparisonEngine;
    use crate::domain::metric::{BaselineStat, CurrentStat};
    use std::collections::HashMap;

    #[test]
    fn test_new_metrics_are_not_candidates() {
        let known = MetricKey::new("orders", "amount", "mean");
        let baseline = HashMap::from([(known.clone(), BaselineStat { mean: 10.0, std: 1.0 })]);
        let current = vec![
            CurrentStat { key: known, value: 12.0 },
            CurrentStat {
                key: MetricKey::new("orders", "discount", "mean"),
                value: 3.0,
            },
        ];

        let candidates = from_comparisons(&ComparisonEngine::compare(&current, &baseline));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].key.column, "amount");
        assert_eq!(candidates[0].dimension, Dimension::Distribution);
        assert_eq!(candidates[0].source, DetectorKind::Comparison);
    }
}
