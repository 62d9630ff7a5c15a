// dqscore-core/src/application/detectors.rs
//
// Detectors read their feed once per run (set-oriented) and turn it into
// anomaly candidates. They never assign severity themselves.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::detection::referential::ForeignKeyValidator;
use crate::domain::detection::schema::schema_drift;
use crate::domain::detection::{AnomalyCandidate, DetectorKind, from_comparisons};
use crate::domain::run::RunScope;
use crate::error::DqError;
use crate::ports::store::QualityStore;

#[async_trait]
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    async fn detect(
        &self,
        store: &dyn QualityStore,
        scope: RunScope,
    ) -> Result<Vec<AnomalyCandidate>, DqError>;
}

/// Metric deviations, from the comparison results persisted by the previous stage.
pub struct ComparisonDetector;

#[async_trait]
impl Detector for ComparisonDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Comparison
    }

    async fn detect(
        &self,
        store: &dyn QualityStore,
        scope: RunScope,
    ) -> Result<Vec<AnomalyCandidate>, DqError> {
        let results = store.comparison_results(scope).await?;
        if results.is_empty() {
            info!("No comparison results for this run");
        }
        Ok(from_comparisons(&results))
    }
}

pub struct SchemaDriftDetector;

#[async_trait]
impl Detector for SchemaDriftDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SchemaDrift
    }

    async fn detect(
        &self,
        store: &dyn QualityStore,
        scope: RunScope,
    ) -> Result<Vec<AnomalyCandidate>, DqError> {
        let snapshots = store.schema_snapshots(scope).await?;
        match (snapshots.baseline_date, snapshots.current_date) {
            (Some(baseline), Some(current)) if baseline < current => {
                debug!(%baseline, %current, "Comparing schema snapshots");
                Ok(schema_drift(&snapshots.baseline, &snapshots.current))
            }
            (None, _) | (_, None) => {
                info!("No schema snapshot for this run");
                Ok(Vec::new())
            }
            // A single snapshot cannot drift
            _ => Ok(Vec::new()),
        }
    }
}

pub struct ReferentialDriftDetector {
    validator: ForeignKeyValidator,
}

impl ReferentialDriftDetector {
    pub fn new() -> Result<Self, DqError> {
        Ok(Self {
            validator: ForeignKeyValidator::new()?,
        })
    }
}

#[async_trait]
impl Detector for ReferentialDriftDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::ReferentialDrift
    }

    async fn detect(
        &self,
        store: &dyn QualityStore,
        scope: RunScope,
    ) -> Result<Vec<AnomalyCandidate>, DqError> {
        let relationships = store.foreign_keys(scope).await?;
        if relationships.is_empty() {
            info!("No foreign key checks for this run");
        }
        Ok(self.validator.candidates(&relationships)?)
    }
}

/// Comparison, schema drift and referential drift, in that order.
pub fn default_detectors() -> Result<Vec<Box<dyn Detector>>, DqError> {
    Ok(vec![
        Box::new(ComparisonDetector),
        Box::new(SchemaDriftDetector),
        Box::new(ReferentialDriftDetector::new()?),
    ])
}
