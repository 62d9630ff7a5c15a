// dqscore-core/src/domain/alert.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregation::AggregatedAnomaly;
use crate::domain::config::AlertThresholds;
use crate::domain::dimension::Dimension;
use crate::domain::root_cause::RootCause;
use crate::domain::scoring::ScoreRecord;
use crate::domain::severity::Severity;

pub const SUMMARY_NOT_AVAILABLE: &str = "summary not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived at evaluation time, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub dataset_id: i64,
    pub dataset_name: String,
    pub run_date: NaiveDate,
    pub level: AlertLevel,
    pub dq_score: i64,
    pub issue: Option<Dimension>,
    pub summary: String,
}

pub struct AlertEvaluator;

impl AlertEvaluator {
    /// `aggregates` and `root_cause` must belong to `latest.scope.run_date`.
    pub fn evaluate(
        dataset_name: &str,
        latest: &ScoreRecord,
        aggregates: &[AggregatedAnomaly],
        root_cause: Option<&RootCause>,
        thresholds: &AlertThresholds,
    ) -> Option<AlertEvent> {
        let score = latest.dq_score as f64;
        let mut level = if score < thresholds.critical_score {
            Some(AlertLevel::Critical)
        } else if score < thresholds.warning_score {
            Some(AlertLevel::Warning)
        } else {
            None
        };

        // First HIGH dimension in lexical order
        let high_dimension = aggregates
            .iter()
            .filter(|a| a.dominant_severity == Severity::High)
            .map(|a| a.dimension)
            .min();

        if level.is_none() && high_dimension.is_some() {
            level = Some(AlertLevel::Critical);
        }
        let level = level?;

        let issue = latest.top_issue.or(high_dimension);
        let summary = match (issue, root_cause) {
            (Some(dim), Some(rc)) if rc.dimension == dim => rc.summary.clone(),
            _ => SUMMARY_NOT_AVAILABLE.to_string(),
        };

        Some(AlertEvent {
            dataset_id: latest.scope.dataset_id,
            dataset_name: dataset_name.to_string(),
            run_date: latest.scope.run_date,
            level,
            dq_score: latest.dq_score,
            issue,
            summary,
        })
    }
}
