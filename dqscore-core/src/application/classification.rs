// dqscore-core/src/application/classification.rs

use tracing::{debug, info, instrument, warn};

use crate::application::detectors::Detector;
use crate::application::engine::StageContext;
use crate::domain::anomaly::AnomalyObservation;
use crate::domain::detection::{AnomalyClassifier, Classification};
use crate::error::DqError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub candidates: usize,
    pub anomalies: usize,
    pub filtered: usize,
    pub below_threshold: usize,
    pub unclassified: usize,
    /// Anomalies seen for the second time or more on this key.
    pub repeated: usize,
}

/// Runs every detector, classifies their candidates and upserts the anomalies
/// in a single batch.
#[instrument(skip(ctx, detectors), fields(scope = %ctx.scope))]
pub async fn run_classification(
    ctx: StageContext<'_>,
    detectors: &[Box<dyn Detector>],
) -> Result<ClassificationReport, DqError> {
    let noise = ctx.config.noise();
    let mut report = ClassificationReport::default();
    let mut observations = Vec::new();

    for detector in detectors {
        let candidates = detector.detect(ctx.store, ctx.scope).await?;
        debug!(detector = %detector.kind(), candidates = candidates.len(), "Detector finished");
        report.candidates += candidates.len();

        for candidate in &candidates {
            match AnomalyClassifier::classify(candidate, noise) {
                Classification::Anomaly(classified) => {
                    observations.push(AnomalyObservation::new(ctx.scope, candidate, classified));
                }
                Classification::Filtered(filter) => {
                    debug!(key = %candidate.key, %filter, "Candidate filtered as noise");
                    report.filtered += 1;
                }
                Classification::BelowThreshold => report.below_threshold += 1,
                Classification::Unclassified(reason) => {
                    warn!(
                        key = %candidate.key,
                        dimension = %candidate.dimension,
                        source = %candidate.source,
                        reason = %reason,
                        "Unclassified candidate"
                    );
                    report.unclassified += 1;
                }
            }
        }
    }

    let persistence = ctx.store.upsert_anomalies(&observations).await?;
    report.anomalies = observations.len();
    report.repeated = persistence.iter().filter(|p| **p > 1).count();

    info!(
        candidates = report.candidates,
        anomalies = report.anomalies,
        filtered = report.filtered,
        below_threshold = report.below_threshold,
        unclassified = report.unclassified,
        "🔎 Classification complete"
    );
    Ok(report)
}
