// dqscore-core/src/domain/run.rs

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

/// The (dataset, run_date) pair every stage works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunScope {
    pub dataset_id: i64,
    pub run_date: NaiveDate,
}

impl RunScope {
    pub fn new(dataset_id: i64, run_date: NaiveDate) -> Self {
        Self {
            dataset_id,
            run_date,
        }
    }

    pub fn previous_day(&self) -> NaiveDate {
        self.run_date - Duration::days(1)
    }

    /// Inclusive bounds of the trailing baseline window: the `days` days
    /// before the run date, the run date itself excluded.
    pub fn baseline_window(&self, days: u32) -> (NaiveDate, NaiveDate) {
        (
            self.run_date - Duration::days(i64::from(days)),
            self.previous_day(),
        )
    }
}

impl fmt::Display for RunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset_id={} run_date={}", self.dataset_id, self.run_date)
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Comparison,
    Classification,
    Aggregation,
    Scoring,
    RootCause,
    Alerting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comparison => "comparison",
            Self::Classification => "classification",
            Self::Aggregation => "aggregation",
            Self::Scoring => "scoring",
            Self::RootCause => "root_cause",
            Self::Alerting => "alerting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            _ => Err(DomainError::InvariantViolation(format!(
                "Unknown run status: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: i64,
    pub dataset_name: String,
    pub contract_path: Option<String>,
}

impl Dataset {
    /// Names become directory names in exports: ASCII letters, digits,
    /// `_`, `-` and `.`, starting with a letter or digit.
    pub fn validate_name(name: &str) -> Result<(), DomainError> {
        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(DomainError::ConfigurationError(format!(
                "invalid dataset name '{}': use letters, digits, '_', '-' or '.'",
                name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub dataset_id: i64,
    pub dataset_name: String,
    pub run_date: NaiveDate,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: RunStatus,
    pub failed_stage: Option<String>,
}

/// Every date from `start` to `end`, both included.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, DomainError> {
    if end < start {
        return Err(DomainError::ConfigurationError(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}
