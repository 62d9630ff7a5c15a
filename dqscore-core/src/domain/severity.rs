// dqscore-core/src/domain/severity.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

// Declaration order gives Low < Medium < High through the derived Ord, so the
// aggregator and the root cause ranking can simply use max() / sort().

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(DomainError::InvariantViolation(format!(
                "Unknown severity label: '{}'",
                s
            ))),
        }
    }
}

/// Threshold tables mapping a deviation magnitude to a severity.
///
/// Every function returns `None` below the LOW floor: such deviations are noise.
pub struct SeverityRules;

impl SeverityRules {
    /// `delta_pct` is the change of the null rate in percentage points.
    pub fn completeness(delta_pct: f64) -> Option<Severity> {
        Self::grade(delta_pct, 5.0, 2.0, 0.5)
    }

    /// `delta_pct` is the relative row count change, in percent.
    pub fn volume(delta_pct: f64) -> Option<Severity> {
        Self::grade(delta_pct, 30.0, 10.0, 5.0)
    }

    pub fn distribution(z_score: f64) -> Option<Severity> {
        Self::grade(z_score.abs(), 3.0, 2.0, 1.5)
    }

    /// `rate` is the fraction of child rows without a matching parent.
    pub fn referential(rate: f64) -> Option<Severity> {
        Self::grade(rate, 0.02, 0.01, 0.005)
    }

    fn grade(value: f64, high: f64, medium: f64, low: f64) -> Option<Severity> {
        if value.is_nan() {
            return None;
        }
        if value >= high {
            Some(Severity::High)
        } else if value >= medium {
            Some(Severity::Medium)
        } else if value >= low {
            Some(Severity::Low)
        } else {
            None
        }
    }
}
