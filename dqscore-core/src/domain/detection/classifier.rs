// dqscore-core/src/domain/detection/classifier.rs

use std::fmt;

use crate::domain::config::NoiseSettings;
use crate::domain::detection::{AnomalyCandidate, Signal};
use crate::domain::dimension::Dimension;
use crate::domain::severity::{Severity, SeverityRules};

/// Values retained for an accepted candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedAnomaly {
    pub severity: Severity,
    /// Magnitude that was graded, in percent (percentage points for null rates).
    pub deviation_percent: Option<f64>,
    pub baseline_value: Option<f64>,
    pub current_value: Option<f64>,
    pub z_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseFilter {
    /// Completeness metric at zero both before and now.
    BothZero,
    /// Baseline standard deviation under `min_std_dev`.
    FlatBaseline,
    /// Relative change under `min_change_pct`.
    BelowChangeFloor,
}

impl fmt::Display for NoiseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BothZero => "baseline and current are both zero",
            Self::FlatBaseline => "baseline standard deviation below floor",
            Self::BelowChangeFloor => "relative change below floor",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Anomaly(ClassifiedAnomaly),
    /// Dropped by a dimension-specific noise filter.
    Filtered(NoiseFilter),
    /// Graded, but under the LOW threshold.
    BelowThreshold,
    /// No rule can grade this candidate. Surfaced, never raised.
    Unclassified(String),
}

pub struct AnomalyClassifier;

impl AnomalyClassifier {
    pub fn classify(candidate: &AnomalyCandidate, noise: &NoiseSettings) -> Classification {
        match &candidate.signal {
            Signal::Categorical { severity, .. } => Classification::Anomaly(ClassifiedAnomaly {
                severity: *severity,
                deviation_percent: None,
                baseline_value: None,
                current_value: None,
                z_score: None,
            }),

            Signal::ViolationRate { rate } => graded(
                SeverityRules::referential(*rate),
                ClassifiedAnomaly {
                    severity: Severity::Low,
                    deviation_percent: Some(rate * 100.0),
                    baseline_value: Some(0.0),
                    current_value: Some(*rate),
                    z_score: None,
                },
            ),

            Signal::Deviation {
                baseline_mean,
                baseline_std,
                current,
                percentage_deviation,
                z_score,
            } => {
                let retained = |deviation_percent: Option<f64>| ClassifiedAnomaly {
                    severity: Severity::Low,
                    deviation_percent,
                    baseline_value: Some(*baseline_mean),
                    current_value: Some(*current),
                    z_score: Some(*z_score),
                };

                match candidate.dimension {
                    Dimension::Completeness => {
                        if *baseline_mean == 0.0 && *current == 0.0 {
                            return Classification::Filtered(NoiseFilter::BothZero);
                        }
                        let delta_pct = (current - baseline_mean).abs() * 100.0;
                        graded(SeverityRules::completeness(delta_pct), retained(Some(delta_pct)))
                    }

                    Dimension::Volume => match percentage_deviation {
                        Some(pct) => {
                            let delta_pct = pct.abs() * 100.0;
                            graded(SeverityRules::volume(delta_pct), retained(Some(delta_pct)))
                        }
                        None => Classification::Unclassified(
                            "volume change is undefined against a zero baseline".to_string(),
                        ),
                    },

                    Dimension::Distribution => {
                        if *baseline_std < noise.min_std_dev {
                            return Classification::Filtered(NoiseFilter::FlatBaseline);
                        }
                        let change_pct = percentage_deviation.map(|p| p.abs() * 100.0);
                        if let Some(change) = change_pct
                            && change < noise.min_change_pct
                        {
                            return Classification::Filtered(NoiseFilter::BelowChangeFloor);
                        }
                        graded(SeverityRules::distribution(*z_score), retained(change_pct))
                    }

                    Dimension::Referential => graded(
                        SeverityRules::referential(*current),
                        retained(Some(current * 100.0)),
                    ),

                    Dimension::Schema | Dimension::Freshness | Dimension::Other => {
                        Classification::Unclassified(format!(
                            "no threshold rule for the {} dimension",
                            candidate.dimension
                        ))
                    }
                }
            }
        }
    }
}

fn graded(severity: Option<Severity>, mut retained: ClassifiedAnomaly) -> Classification {
    match severity {
        Some(severity) => {
            retained.severity = severity;
            Classification::Anomaly(retained)
        }
        None => Classification::BelowThreshold,
    }
}
