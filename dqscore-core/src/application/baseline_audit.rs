// dqscore-core/src/application/baseline_audit.rs

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::domain::baseline_audit::BaselineAudit;
use crate::domain::config::QualityConfig;
use crate::domain::run::{Dataset, RunScope};
use crate::error::DqError;
use crate::ports::store::QualityStore;

/// Summarizes the baseline window a run on `audit_date` would compare against.
/// Read-only: nothing is written to the store.
#[instrument(skip(store, config, dataset), fields(dataset = %dataset.dataset_name))]
pub async fn audit_baseline(
    store: &dyn QualityStore,
    config: &QualityConfig,
    dataset: &Dataset,
    audit_date: NaiveDate,
) -> Result<Option<BaselineAudit>, DqError> {
    let scope = RunScope::new(dataset.dataset_id, audit_date);
    let window_days = config.baseline_window_days();
    let window = scope.baseline_window(window_days);

    let feed = store.baseline_samples(scope, window_days).await?;
    if feed.skipped > 0 {
        warn!(skipped = feed.skipped, "Skipped unparseable baseline values");
    }

    let audit = BaselineAudit::summarize(
        &dataset.dataset_name,
        audit_date,
        window,
        &feed.data,
        feed.skipped,
    );

    match &audit {
        Some(a) => info!(samples = a.samples, from = %window.0, to = %window.1, "🔎 Baseline audited"),
        None => warn!(from = %window.0, to = %window.1, "No baseline data found"),
    }
    Ok(audit)
}
