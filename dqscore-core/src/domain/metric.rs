// dqscore-core/src/domain/metric.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column name used by table-level metrics (row counts, schema hashes...).
pub const TABLE_LEVEL_COLUMN: &str = "__table__";

/// Identity of a metric across every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub table: String,
    pub column: String,
    pub metric_name: String,
}

impl MetricKey {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            metric_name: metric_name.into(),
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.table, self.column, self.metric_name)
    }
}

/// Observed value of a metric for the run being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentStat {
    pub key: MetricKey,
    pub value: f64,
}

/// Expected value of a metric, reduced from a trailing window of history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStat {
    pub mean: f64,
    pub std: f64,
}

impl BaselineStat {
    /// Population mean and standard deviation of the samples.
    /// Returns `None` when there is no sample to reduce.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: variance.sqrt(),
        })
    }
}

/// Lenient numeric parsing for feed values stored as text.
/// Non-finite values are rejected like unparseable ones.
pub fn parse_metric_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std() {
        let stat = BaselineStat::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stat.mean - 5.0).abs() < 1e-12);
        assert!((stat.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_has_zero_std() {
        let stat = BaselineStat::from_samples(&[42.0]).unwrap();
        assert_eq!(stat.mean, 42.0);
        assert_eq!(stat.std, 0.0);
        assert!(BaselineStat::from_samples(&[]).is_none());
    }

    #[test]
    fn test_parse_metric_value() {
        assert_eq!(parse_metric_value(" 0.25 "), Some(0.25));
        assert_eq!(parse_metric_value("1e3"), Some(1000.0));
        assert_eq!(parse_metric_value("n/a"), None);
        assert_eq!(parse_metric_value("NaN"), None);
        assert_eq!(parse_metric_value("inf"), None);
    }
}
