// dqscore-core/src/application/alerting.rs

use tracing::{debug, info, instrument};

use crate::application::engine::StageContext;
use crate::domain::alert::{AlertEvaluator, AlertEvent};
use crate::error::DqError;
use crate::ports::alert_sink::AlertSink;

/// Evaluates the latest score at or before the run date and notifies every sink.
#[instrument(skip(ctx, sinks), fields(scope = %ctx.scope))]
pub async fn run_alerting(
    ctx: StageContext<'_>,
    dataset_name: &str,
    sinks: &[Box<dyn AlertSink>],
) -> Result<Option<AlertEvent>, DqError> {
    let Some(latest) = ctx
        .store
        .latest_score(ctx.scope.dataset_id, ctx.scope.run_date)
        .await?
    else {
        info!("No score history, skipping alerts");
        return Ok(None);
    };

    let scope = latest.scope;
    let aggregates = ctx.store.aggregates(scope).await?;
    let root_cause = ctx.store.root_cause(scope).await?;

    let Some(event) = AlertEvaluator::evaluate(
        dataset_name,
        &latest,
        &aggregates,
        root_cause.as_ref(),
        ctx.config.alerts(),
    ) else {
        info!(score = latest.dq_score, "No alerts triggered");
        return Ok(None);
    };

    for sink in sinks {
        debug!(sink = sink.sink_name(), "Delivering alert");
        sink.notify(&event).await?;
    }
    Ok(Some(event))
}
