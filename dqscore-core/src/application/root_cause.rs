// dqscore-core/src/application/root_cause.rs

use tracing::{info, instrument};

use crate::application::engine::StageContext;
use crate::domain::root_cause::{RootCauseAnalyzer, RootCauseOutcome};
use crate::domain::run::RunScope;
use crate::error::DqError;

#[instrument(skip(ctx), fields(scope = %ctx.scope))]
pub async fn run_root_cause(ctx: StageContext<'_>) -> Result<RootCauseOutcome, DqError> {
    let previous_scope = RunScope::new(ctx.scope.dataset_id, ctx.scope.previous_day());
    let previous = ctx.store.score(previous_scope).await?;
    let current = ctx.store.score(ctx.scope).await?;
    let aggregates = ctx.store.aggregates(ctx.scope).await?;
    let anomalies = ctx.store.open_anomalies(ctx.scope).await?;

    let outcome = RootCauseAnalyzer::analyze(
        ctx.scope,
        previous.as_ref(),
        current.as_ref(),
        &aggregates,
        &anomalies,
    );

    match &outcome {
        RootCauseOutcome::InsufficientHistory => {
            info!("Not enough score history for root cause analysis")
        }
        RootCauseOutcome::NoRegression {
            prev_score,
            current_score,
        } => info!(prev_score, current_score, "No score drop detected"),
        RootCauseOutcome::NoAggregates => info!("No aggregated anomalies found"),
        RootCauseOutcome::Attributed(root_cause) => {
            if ctx.store.insert_root_cause(root_cause).await? {
                info!(summary = %root_cause.summary, "🧭 Root cause recorded");
            } else {
                info!("Root cause already recorded for this run");
            }
        }
    }
    Ok(outcome)
}
