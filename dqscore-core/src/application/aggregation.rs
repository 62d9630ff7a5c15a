// dqscore-core/src/application/aggregation.rs

use tracing::{info, instrument};

use crate::application::engine::StageContext;
use crate::domain::aggregation::AnomalyAggregator;
use crate::error::DqError;

/// Returns the number of (dimension, table) groups written.
#[instrument(skip(ctx), fields(scope = %ctx.scope))]
pub async fn run_aggregation(ctx: StageContext<'_>) -> Result<usize, DqError> {
    let anomalies = ctx.store.open_anomalies(ctx.scope).await?;
    if anomalies.is_empty() {
        info!("No anomalies to aggregate");
        return Ok(0);
    }

    let aggregates = AnomalyAggregator::aggregate(&anomalies);
    ctx.store.upsert_aggregates(ctx.scope, &aggregates).await?;

    info!(
        anomalies = anomalies.len(),
        groups = aggregates.len(),
        "🧮 Aggregation complete"
    );
    Ok(aggregates.len())
}
