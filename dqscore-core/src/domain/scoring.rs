// dqscore-core/src/domain/scoring.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregation::AggregatedAnomaly;
use crate::domain::config::QualityConfig;
use crate::domain::dimension::Dimension;
use crate::domain::error::DomainError;
use crate::domain::run::RunScope;

pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreStatus {
    Ok,
    Warning,
    Critical,
}

impl ScoreStatus {
    /// 90 and above is OK, 70 and above is WARNING.
    pub fn from_score(score: i64) -> Self {
        if score >= 90 {
            Self::Ok
        } else if score >= 70 {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScoreStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "WARNING" => Ok(Self::Warning),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(DomainError::InvariantViolation(format!(
                "Unknown score status: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub scope: RunScope,
    pub dq_score: i64,
    pub status: ScoreStatus,
    pub top_issue: Option<Dimension>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCalculation {
    pub record: ScoreRecord,
    pub total_penalty: f64,
}

pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn calculate(
        scope: RunScope,
        aggregates: &[AggregatedAnomaly],
        config: &QualityConfig,
    ) -> ScoreCalculation {
        let mut total_penalty = 0.0;
        let mut top: Option<(f64, &AggregatedAnomaly)> = None;

        for row in aggregates {
            let penalty = Self::row_penalty(row, config);
            total_penalty += penalty;

            if penalty <= 0.0 {
                continue;
            }
            let replace = match top {
                None => true,
                Some((best, current)) => {
                    penalty > best
                        || (penalty == best
                            && (row.dimension, row.table.as_str())
                                < (current.dimension, current.table.as_str()))
                }
            };
            if replace {
                top = Some((penalty, row));
            }
        }

        let dq_score = (MAX_SCORE - total_penalty.floor() as i64).clamp(0, MAX_SCORE);

        ScoreCalculation {
            record: ScoreRecord {
                scope,
                dq_score,
                status: ScoreStatus::from_score(dq_score),
                top_issue: top.map(|(_, row)| row.dimension),
            },
            total_penalty,
        }
    }

    /// base_penalty[severity] x multiplier, capped at the dimension weight.
    pub fn row_penalty(row: &AggregatedAnomaly, config: &QualityConfig) -> f64 {
        let raw = config.base_penalty(row.dominant_severity) * row.penalty_multiplier as f64;
        raw.min(config.weight(row.dimension))
    }
}
