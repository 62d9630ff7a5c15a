// dqscore-core/src/infrastructure/export.rs
//
// CSV audit exports: comparison results and baseline audit summaries.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::baseline_audit::BaselineAudit;
use crate::domain::comparison::ComparisonResult;
use crate::domain::error::DomainError;
use crate::domain::run::{Dataset, RunScope};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write_with;

pub const COMPARISON_HEADER: [&str; 9] = [
    "table",
    "column",
    "metric",
    "status",
    "baseline_mean",
    "current_value",
    "absolute_deviation",
    "percentage_deviation",
    "z_score",
];

pub const BASELINE_AUDIT_HEADER: [&str; 12] = [
    "dataset",
    "audit_run_date",
    "window_start",
    "window_end",
    "samples",
    "skipped",
    "avg_null_rate",
    "avg_record_count",
    "min_mean",
    "max_mean",
    "min_std_dev",
    "max_std_dev",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `<export_dir>/<dataset>/comparison_<run_date>.csv`
pub fn comparison_export_path(
    export_dir: &Path,
    dataset_name: &str,
    scope: RunScope,
) -> Result<PathBuf, DomainError> {
    Dataset::validate_name(dataset_name)?;
    Ok(export_dir
        .join(dataset_name)
        .join(format!("comparison_{}.csv", scope.run_date)))
}

pub fn write_comparison_csv(
    path: &Path,
    results: &[ComparisonResult],
) -> Result<(), InfrastructureError> {
    atomic_write_with(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(COMPARISON_HEADER)?;
        for r in results {
            writer.write_record([
                r.key.table.clone(),
                r.key.column.clone(),
                r.key.metric_name.clone(),
                r.status.as_str().to_string(),
                cell(r.baseline_mean),
                r.current_value.to_string(),
                cell(r.absolute_deviation),
                cell(r.percentage_deviation),
                cell(r.z_score),
            ])?;
        }
        writer.flush()?;
        Ok(())
    })?;

    info!(path = ?path, rows = results.len(), "📄 Comparison audit exported");
    Ok(())
}

/// One row per audited dataset, in the order given.
pub fn write_baseline_audit_csv(
    path: &Path,
    audits: &[BaselineAudit],
) -> Result<(), InfrastructureError> {
    atomic_write_with(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(BASELINE_AUDIT_HEADER)?;
        for a in audits {
            writer.write_record([
                a.dataset_name.clone(),
                a.audit_date.to_string(),
                a.window_start.to_string(),
                a.window_end.to_string(),
                a.samples.to_string(),
                a.skipped.to_string(),
                cell(a.avg_null_rate),
                cell(a.avg_record_count),
                cell(a.min_mean),
                cell(a.max_mean),
                cell(a.min_std_dev),
                cell(a.max_std_dev),
            ])?;
        }
        writer.flush()?;
        Ok(())
    })?;

    info!(path = ?path, rows = audits.len(), "📄 Baseline audit exported");
    Ok(())
}
