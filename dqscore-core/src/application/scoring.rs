// dqscore-core/src/application/scoring.rs

use tracing::{info, instrument};

use crate::application::engine::StageContext;
use crate::domain::scoring::{ScoreCalculator, ScoreRecord};
use crate::error::DqError;

#[instrument(skip(ctx), fields(scope = %ctx.scope))]
pub async fn run_scoring(ctx: StageContext<'_>) -> Result<ScoreRecord, DqError> {
    let aggregates = ctx.store.aggregates(ctx.scope).await?;
    let calculation = ScoreCalculator::calculate(ctx.scope, &aggregates, ctx.config);
    ctx.store.upsert_score(&calculation.record).await?;

    info!(
        score = calculation.record.dq_score,
        status = %calculation.record.status,
        total_penalty = calculation.total_penalty,
        top_issue = ?calculation.record.top_issue,
        "🏁 Score computed"
    );
    Ok(calculation.record)
}
