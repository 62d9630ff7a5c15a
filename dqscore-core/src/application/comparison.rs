// dqscore-core/src/application/comparison.rs

use tracing::{info, instrument, warn};

use crate::application::engine::StageContext;
use crate::domain::comparison::{ComparisonEngine, ComparisonStatus};
use crate::domain::error::DomainError;
use crate::error::DqError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonReport {
    pub compared: usize,
    pub new_metrics: usize,
    /// Feed rows dropped because their value could not be parsed.
    pub skipped_rows: usize,
}

/// Joins current stats with their trailing baseline and replaces the run's
/// comparison rows.
#[instrument(skip(ctx), fields(scope = %ctx.scope))]
pub async fn run_comparison(ctx: StageContext<'_>) -> Result<ComparisonReport, DqError> {
    let current = ctx.store.current_stats(ctx.scope).await?;
    if current.data.is_empty() {
        // Not fatal: the run carries on with an empty comparison set
        let reason = DomainError::DataUnavailable(format!("no current stats for {}", ctx.scope));
        warn!("{}", reason);
    }

    let baseline = ctx
        .store
        .baseline_stats(ctx.scope, ctx.config.baseline_window_days())
        .await?;

    let skipped_rows = current.skipped + baseline.skipped;
    if skipped_rows > 0 {
        warn!(
            current = current.skipped,
            baseline = baseline.skipped,
            "Skipped unparseable metric values"
        );
    }

    let results = ComparisonEngine::compare(&current.data, &baseline.data);
    ctx.store.replace_comparison_results(ctx.scope, &results).await?;

    let new_metrics = results
        .iter()
        .filter(|r| r.status == ComparisonStatus::NewMetric)
        .count();

    info!(
        compared = results.len(),
        new_metrics,
        baseline_keys = baseline.data.len(),
        "📊 Comparison complete"
    );

    Ok(ComparisonReport {
        compared: results.len(),
        new_metrics,
        skipped_rows,
    })
}
