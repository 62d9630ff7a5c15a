// dqscore-core/src/domain/comparison.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::error::DomainError;
use crate::domain::metric::{BaselineStat, CurrentStat, MetricKey};

/// Z-scores are clamped to [-Z_CAP, Z_CAP].
pub const Z_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonStatus {
    /// The metric has no baseline yet: nothing to compare against.
    NewMetric,
    Ok,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewMetric => "NEW_METRIC",
            Self::Ok => "OK",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComparisonStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_METRIC" => Ok(Self::NewMetric),
            "OK" => Ok(Self::Ok),
            _ => Err(DomainError::InvariantViolation(format!(
                "Unknown comparison status: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub key: MetricKey,
    pub status: ComparisonStatus,
    pub baseline_mean: Option<f64>,
    pub baseline_std: Option<f64>,
    pub current_value: f64,
    pub absolute_deviation: Option<f64>,
    /// Relative deviation as a fraction of the baseline mean.
    pub percentage_deviation: Option<f64>,
    pub z_score: Option<f64>,
}

pub struct ComparisonEngine;

impl ComparisonEngine {
    /// Joins current stats against their baselines. One result per current key,
    /// sorted by key so exports are stable between reruns.
    pub fn compare(
        current: &[CurrentStat],
        baseline: &HashMap<MetricKey, BaselineStat>,
    ) -> Vec<ComparisonResult> {
        let mut results: Vec<ComparisonResult> = current
            .iter()
            .map(|stat| match baseline.get(&stat.key) {
                None => ComparisonResult {
                    key: stat.key.clone(),
                    status: ComparisonStatus::NewMetric,
                    baseline_mean: None,
                    baseline_std: None,
                    current_value: stat.value,
                    absolute_deviation: None,
                    percentage_deviation: None,
                    z_score: None,
                },
                Some(b) => ComparisonResult {
                    key: stat.key.clone(),
                    status: ComparisonStatus::Ok,
                    baseline_mean: Some(b.mean),
                    baseline_std: Some(b.std),
                    current_value: stat.value,
                    absolute_deviation: Some(stat.value - b.mean),
                    percentage_deviation: percentage_deviation(stat.value, b.mean),
                    z_score: Some(z_score(stat.value, b.mean, b.std)),
                },
            })
            .collect();

        results.sort_by(|a, b| a.key.cmp(&b.key));
        results
    }
}

/// (current - mean) / mean, undefined when the mean is zero.
pub fn percentage_deviation(current: f64, mean: f64) -> Option<f64> {
    if mean == 0.0 {
        return None;
    }
    Some((current - mean) / mean)
}

/// (current - mean) / std clamped to ±Z_CAP. A flat baseline (std = 0) yields 0.
pub fn z_score(current: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    ((current - mean) / std).clamp(-Z_CAP, Z_CAP)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stat(table: &str, column: &str, metric: &str, value: f64) -> CurrentStat {
        CurrentStat {
            key: MetricKey::new(table, column, metric),
            value,
        }
    }

    #[test]
    fn test_new_metric_has_no_derived_fields() {
        let current = vec![stat("orders", "amount", "mean", 12.0)];
        let results = ComparisonEngine::compare(&current, &HashMap::new());

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.status, ComparisonStatus::NewMetric);
        assert_eq!(r.current_value, 12.0);
        assert!(r.baseline_mean.is_none());
        assert!(r.absolute_deviation.is_none());
        assert!(r.percentage_deviation.is_none());
        assert!(r.z_score.is_none());
    }

    #[test]
    fn test_deviation_fields() {
        let key = MetricKey::new("orders", "amount", "mean");
        let baseline = HashMap::from([(key.clone(), BaselineStat { mean: 100.0, std: 10.0 })]);
        let results = ComparisonEngine::compare(&[stat("orders", "amount", "mean", 130.0)], &baseline);

        let r = &results[0];
        assert_eq!(r.status, ComparisonStatus::Ok);
        assert_eq!(r.absolute_deviation, Some(30.0));
        assert!((r.percentage_deviation.unwrap() - 0.3).abs() < 1e-12);
        assert!((r.z_score.unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_std_gives_exactly_zero_z() {
        assert_eq!(z_score(1_000.0, 1.0, 0.0), 0.0);
        assert_eq!(z_score(-5.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_z_is_clamped() {
        for (current, mean, std) in [(1e9, 0.0, 1.0), (-1e9, 0.0, 1.0), (11.0, 0.0, 1.0), (0.5, 0.0, 1e-12)] {
            let z = z_score(current, mean, std);
            assert!((-Z_CAP..=Z_CAP).contains(&z), "z={} out of range", z);
        }
        assert_eq!(z_score(1e9, 0.0, 1.0), Z_CAP);
        assert_eq!(z_score(-1e9, 0.0, 1.0), -Z_CAP);
    }

    #[test]
    fn test_zero_mean_has_no_percentage() {
        assert_eq!(percentage_deviation(5.0, 0.0), None);
        let key = MetricKey::new("t", "c", "null_rate");
        let baseline = HashMap::from([(key, BaselineStat { mean: 0.0, std: 0.0 })]);
        let results = ComparisonEngine::compare(&[stat("t", "c", "null_rate", 0.2)], &baseline);
        assert_eq!(results[0].percentage_deviation, None);
        assert_eq!(results[0].absolute_deviation, Some(0.2));
        assert_eq!(results[0].z_score, Some(0.0));
    }

    #[test]
    fn test_results_are_sorted_by_key() {
        let current = vec![
            stat("b", "x", "mean", 1.0),
            stat("a", "y", "mean", 1.0),
            stat("a", "x", "mean", 1.0),
        ];
        let results = ComparisonEngine::compare(&current, &HashMap::new());
        let keys: Vec<String> = results.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["a.x:mean", "a.y:mean", "b.x:mean"]);
    }
}
