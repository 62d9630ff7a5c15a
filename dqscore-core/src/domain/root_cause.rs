// dqscore-core/src/domain/root_cause.rs

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::domain::aggregation::AggregatedAnomaly;
use crate::domain::anomaly::Anomaly;
use crate::domain::dimension::Dimension;
use crate::domain::run::RunScope;
use crate::domain::scoring::ScoreRecord;

pub const MAX_ROOT_CAUSE_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    pub scope: RunScope,
    pub prev_score: i64,
    pub current_score: i64,
    pub dimension: Dimension,
    pub columns: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootCauseOutcome {
    /// The run date or the day before has no score.
    InsufficientHistory,
    NoRegression { prev_score: i64, current_score: i64 },
    NoAggregates,
    Attributed(RootCause),
}

pub struct RootCauseAnalyzer;

impl RootCauseAnalyzer {
    /// `previous` must be the score of `scope.run_date - 1`, `current` the one
    /// of `scope.run_date`. `anomalies` are the run date's anomalies.
    pub fn analyze(
        scope: RunScope,
        previous: Option<&ScoreRecord>,
        current: Option<&ScoreRecord>,
        aggregates: &[AggregatedAnomaly],
        anomalies: &[Anomaly],
    ) -> RootCauseOutcome {
        let (Some(previous), Some(current)) = (previous, current) else {
            return RootCauseOutcome::InsufficientHistory;
        };

        if current.dq_score >= previous.dq_score {
            return RootCauseOutcome::NoRegression {
                prev_score: previous.dq_score,
                current_score: current.dq_score,
            };
        }

        let Some(top) = aggregates.iter().min_by(|a, b| {
            (Reverse(a.dominant_severity), a.dimension, a.table.as_str()).cmp(&(
                Reverse(b.dominant_severity),
                b.dimension,
                b.table.as_str(),
            ))
        }) else {
            return RootCauseOutcome::NoAggregates;
        };

        let columns = Self::top_columns(top.dimension, anomalies);

        RootCauseOutcome::Attributed(RootCause {
            scope,
            prev_score: previous.dq_score,
            current_score: current.dq_score,
            dimension: top.dimension,
            summary: summary(previous.dq_score, current.dq_score, top.dimension, &columns),
            columns,
        })
    }

    /// Distinct columns of `dimension`, most severe first, then by name.
    fn top_columns(dimension: Dimension, anomalies: &[Anomaly]) -> Vec<String> {
        let mut ranked: Vec<&Anomaly> = anomalies
            .iter()
            .filter(|a| a.dimension == dimension)
            .collect();
        ranked.sort_by(|a, b| {
            (Reverse(a.severity), &a.key.column).cmp(&(Reverse(b.severity), &b.key.column))
        });

        let mut columns: Vec<String> = Vec::new();
        for anomaly in ranked {
            if !columns.contains(&anomaly.key.column) {
                columns.push(anomaly.key.column.clone());
            }
            if columns.len() == MAX_ROOT_CAUSE_COLUMNS {
                break;
            }
        }
        columns
    }
}

pub fn summary(prev_score: i64, current_score: i64, dimension: Dimension, columns: &[String]) -> String {
    format!(
        "DQ score dropped from {} to {} due to {} issues affecting columns: {}",
        prev_score,
        current_score,
        dimension,
        columns.join(", ")
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::aggregation::tests::anomaly;
    use crate::domain::aggregation::AnomalyAggregator;
    use crate::domain::metric::TABLE_LEVEL_COLUMN;
    use crate::domain::scoring::ScoreStatus;
    use crate::domain::severity::Severity;
    use chrono::NaiveDate;

    fn scope() -> RunScope {
        RunScope::new(1, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
    }

    fn score(run_date: NaiveDate, dq_score: i64) -> ScoreRecord {
        ScoreRecord {
            scope: RunScope::new(1, run_date),
            dq_score,
            status: ScoreStatus::from_score(dq_score),
            top_issue: None,
        }
    }

    #[test]
    fn test_regression_is_attributed() {
        let s = scope();
        let anomalies = vec![
            anomaly(Dimension::Completeness, "orders", "email", Severity::High),
            anomaly(Dimension::Completeness, "orders", "phone", Severity::Medium),
        ];
        let aggregates = AnomalyAggregator::aggregate(&anomalies);

        let outcome = RootCauseAnalyzer::analyze(
            s,
            Some(&score(s.previous_day(), 95)),
            Some(&score(s.run_date, 80)),
            &aggregates,
            &anomalies,
        );

        match outcome {
            RootCauseOutcome::Attributed(rc) => {
                assert_eq!(rc.dimension, Dimension::Completeness);
                assert_eq!(rc.columns, vec!["email", "phone"]);
                insta::assert_snapshot!(rc.summary, @"DQ score dropped from 95 to 80 due to completeness issues affecting columns: email, phone");
            }
            other => panic!("expected attribution, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_previous_day() {
        let s = scope();
        let outcome = RootCauseAnalyzer::analyze(s, None, Some(&score(s.run_date, 50)), &[], &[]);
        assert_eq!(outcome, RootCauseOutcome::InsufficientHistory);
    }

    #[test]
    fn test_equal_or_higher_score_is_no_regression() {
        let s = scope();
        for current in [95, 99] {
            let outcome = RootCauseAnalyzer::analyze(
                s,
                Some(&score(s.previous_day(), 95)),
                Some(&score(s.run_date, current)),
                &[],
                &[],
            );
            assert!(matches!(outcome, RootCauseOutcome::NoRegression { .. }));
        }
    }

    #[test]
    fn test_regression_without_aggregates() {
        let s = scope();
        let outcome = RootCauseAnalyzer::analyze(
            s,
            Some(&score(s.previous_day(), 95)),
            Some(&score(s.run_date, 80)),
            &[],
            &[],
        );
        assert_eq!(outcome, RootCauseOutcome::NoAggregates);
    }

    #[test]
    fn test_ranking_prefers_severity_then_name() {
        let s = scope();
        let anomalies = vec![
            anomaly(Dimension::Volume, "orders", TABLE_LEVEL_COLUMN, Severity::High),
            anomaly(Dimension::Distribution, "orders", "amount", Severity::High),
            anomaly(Dimension::Completeness, "orders", "email", Severity::Medium),
        ];
        let aggregates = AnomalyAggregator::aggregate(&anomalies);
        let outcome = RootCauseAnalyzer::analyze(
            s,
            Some(&score(s.previous_day(), 90)),
            Some(&score(s.run_date, 60)),
            &aggregates,
            &anomalies,
        );
        match outcome {
            RootCauseOutcome::Attributed(rc) => assert_eq!(rc.dimension, Dimension::Distribution),
            other => panic!("expected attribution, got {:?}", other),
        }
    }

    #[test]
    fn test_columns_are_distinct_and_capped() {
        let anomalies = vec![
            anomaly(Dimension::Completeness, "a", "zip", Severity::Low),
            anomaly(Dimension::Completeness, "b", "email", Severity::Medium),
            anomaly(Dimension::Completeness, "a", "email", Severity::High),
            anomaly(Dimension::Completeness, "a", "city", Severity::Medium),
            anomaly(Dimension::Completeness, "a", "name", Severity::Low),
        ];
        let columns = RootCauseAnalyzer::top_columns(Dimension::Completeness, &anomalies);
        assert_eq!(columns, vec!["email", "city", "name"]);
    }
}
