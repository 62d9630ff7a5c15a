// dqscore-core/src/domain/dimension.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

/// A named data-quality category.
///
/// Ord follows the lexical order of the names, which is the tie-break used by
/// scoring and root cause ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    Volume,
    Distribution,
    Freshness,
    Schema,
    Referential,
    Other,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Completeness,
        Dimension::Volume,
        Dimension::Distribution,
        Dimension::Freshness,
        Dimension::Schema,
        Dimension::Referential,
        Dimension::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completeness => "completeness",
            Self::Volume => "volume",
            Self::Distribution => "distribution",
            Self::Freshness => "freshness",
            Self::Schema => "schema",
            Self::Referential => "referential",
            Self::Other => "other",
        }
    }

    /// Keyword rules on the metric name. First match wins.
    pub fn infer(metric_name: &str) -> Self {
        let metric = metric_name.to_lowercase();

        if metric.contains("null") {
            Self::Completeness
        } else if metric.contains("row_count") || metric.contains("volume") {
            Self::Volume
        } else if metric.contains("mean") || metric.contains("std") {
            Self::Distribution
        } else if metric.contains("fresh") || metric.contains("delay") {
            Self::Freshness
        } else if metric.contains("schema") {
            Self::Schema
        } else if metric.contains("fk") || metric.contains("referential") {
            Self::Referential
        } else {
            Self::Other
        }
    }
}

impl PartialOrd for Dimension {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dimension {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| {
                DomainError::InvariantViolation(format!("Unknown dimension label: '{}'", s))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_infer_keywords() {
        assert_eq!(Dimension::infer("null_rate"), Dimension::Completeness);
        assert_eq!(Dimension::infer("NULL_COUNT"), Dimension::Completeness);
        assert_eq!(Dimension::infer("row_count"), Dimension::Volume);
        assert_eq!(Dimension::infer("daily_volume"), Dimension::Volume);
        assert_eq!(Dimension::infer("mean"), Dimension::Distribution);
        assert_eq!(Dimension::infer("std_dev"), Dimension::Distribution);
        assert_eq!(Dimension::infer("freshness_hours"), Dimension::Freshness);
        assert_eq!(Dimension::infer("load_delay"), Dimension::Freshness);
        assert_eq!(Dimension::infer("schema_hash"), Dimension::Schema);
        assert_eq!(Dimension::infer("fk_violation_rate"), Dimension::Referential);
        assert_eq!(Dimension::infer("referential_gap"), Dimension::Referential);
        assert_eq!(Dimension::infer("record_count"), Dimension::Other);
    }

    #[test]
    fn test_first_match_wins() {
        // "null" is checked before "mean"
        assert_eq!(Dimension::infer("mean_null_ratio"), Dimension::Completeness);
    }

    #[test]
    fn test_lexical_ordering() {
        let mut dims = vec![Dimension::Volume, Dimension::Completeness, Dimension::Distribution];
        dims.sort();
        assert_eq!(
            dims,
            vec![Dimension::Completeness, Dimension::Distribution, Dimension::Volume]
        );
    }

    #[test]
    fn test_round_trip_labels() {
        for dim in Dimension::ALL {
            assert_eq!(Dimension::from_str(dim.as_str()).unwrap(), dim);
        }
        assert!(Dimension::from_str("timeliness").is_err());
    }
}
