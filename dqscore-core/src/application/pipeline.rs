// dqscore-core/src/application/pipeline.rs
//
// One run = the six stages, strictly in order, for one (dataset, run_date).
// Each stage commits before the next one starts, so a failure leaves the
// earlier stages' rows in place.

use chrono::{NaiveDate, Utc};
use futures::StreamExt; // Extension trait for streams
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::DqError;

// Application Services
use crate::application::aggregation::run_aggregation;
use crate::application::alerting::run_alerting;
use crate::application::classification::run_classification;
use crate::application::comparison::run_comparison;
use crate::application::detectors::{Detector, default_detectors};
use crate::application::engine::{StageContext, run_stage};
use crate::application::root_cause::run_root_cause;
use crate::application::scoring::run_scoring;

// Domain
use crate::domain::alert::AlertLevel;
use crate::domain::config::QualityConfig;
use crate::domain::run::{Dataset, RunRecord, RunScope, RunStatus, Stage};

// Infrastructure
use crate::infrastructure::export::{comparison_export_path, write_comparison_csv};

// Ports
use crate::ports::alert_sink::AlertSink;
use crate::ports::store::QualityStore;

/// Datasets processed at the same time. Dates of one dataset always run in sequence.
pub const MAX_CONCURRENT_DATASETS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Writes the comparison audit CSV under this directory when set.
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub dataset_name: String,
    pub run_date: NaiveDate,
    pub status: RunStatus,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub anomalies: usize,
    pub unclassified: usize,
    pub score: Option<i64>,
    pub alert: Option<AlertLevel>,
}

#[derive(Debug, Default)]
struct StageSummary {
    anomalies: usize,
    unclassified: usize,
    score: Option<i64>,
    alert: Option<AlertLevel>,
}

struct RunContext<'a> {
    store: &'a dyn QualityStore,
    config: &'a QualityConfig,
    detectors: &'a [Box<dyn Detector>],
    sinks: &'a [Box<dyn AlertSink>],
    options: &'a PipelineOptions,
}

/// Runs every dataset over every date. Reports come back sorted by dataset
/// name, then date. `Err` is reserved for failures outside the stages
/// (run history bookkeeping); stage failures are reported as FAILED runs.
pub async fn run_quality_pipeline(
    store: &dyn QualityStore,
    config: &QualityConfig,
    sinks: &[Box<dyn AlertSink>],
    datasets: &[Dataset],
    run_dates: &[NaiveDate],
    options: &PipelineOptions,
) -> Result<Vec<RunReport>, DqError> {
    let start_time = std::time::Instant::now();
    let detectors = default_detectors()?;
    let ctx = RunContext {
        store,
        config,
        detectors: &detectors,
        sinks,
        options,
    };

    info!(
        datasets = datasets.len(),
        dates = run_dates.len(),
        "🚀 Starting quality pipeline"
    );

    let futures = datasets
        .iter()
        .map(|dataset| run_dataset(&ctx, dataset, run_dates));

    // Parallel execution with bounded concurrency across datasets
    let results: Vec<Result<Vec<RunReport>, DqError>> = futures::stream::iter(futures)
        .buffer_unordered(MAX_CONCURRENT_DATASETS)
        .collect()
        .await;

    let mut reports = Vec::new();
    for result in results {
        reports.extend(result?);
    }
    reports.sort_by(|a, b| {
        (a.dataset_name.as_str(), a.run_date).cmp(&(b.dataset_name.as_str(), b.run_date))
    });

    let failed = reports
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count();
    info!(
        runs = reports.len(),
        failed,
        "✨ Done in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(reports)
}

async fn run_dataset(
    ctx: &RunContext<'_>,
    dataset: &Dataset,
    run_dates: &[NaiveDate],
) -> Result<Vec<RunReport>, DqError> {
    let mut reports = Vec::with_capacity(run_dates.len());
    for (i, run_date) in run_dates.iter().enumerate() {
        let report = run_once(ctx, dataset, *run_date).await?;
        let failed = report.status == RunStatus::Failed;
        reports.push(report);

        // Later dates depend on this day's score
        if failed {
            let remaining = run_dates.len() - i - 1;
            if remaining > 0 {
                warn!(
                    dataset = %dataset.dataset_name,
                    remaining,
                    "Skipping remaining dates after a failed run"
                );
            }
            break;
        }
    }
    Ok(reports)
}

#[instrument(skip_all, fields(dataset = %dataset.dataset_name, run_date = %run_date))]
async fn run_once(
    ctx: &RunContext<'_>,
    dataset: &Dataset,
    run_date: NaiveDate,
) -> Result<RunReport, DqError> {
    let run = RunRecord {
        run_id: Uuid::new_v4().to_string(),
        dataset_id: dataset.dataset_id,
        dataset_name: dataset.dataset_name.clone(),
        run_date,
        start_time: Utc::now().to_rfc3339(),
        end_time: None,
        status: RunStatus::Running,
        failed_stage: None,
    };
    ctx.store.start_run(&run).await?;
    info!(run_id = %run.run_id, "▶️  Run started");

    let stage_ctx = StageContext {
        store: ctx.store,
        config: ctx.config,
        scope: RunScope::new(dataset.dataset_id, run_date),
    };

    let mut report = RunReport {
        run_id: run.run_id.clone(),
        dataset_name: dataset.dataset_name.clone(),
        run_date,
        status: RunStatus::Success,
        failed_stage: None,
        error: None,
        anomalies: 0,
        unclassified: 0,
        score: None,
        alert: None,
    };

    match execute_stages(ctx, stage_ctx, dataset).await {
        Ok(summary) => {
            ctx.store
                .finish_run(&run.run_id, RunStatus::Success, None)
                .await?;
            report.anomalies = summary.anomalies;
            report.unclassified = summary.unclassified;
            report.score = summary.score;
            report.alert = summary.alert;
            info!(run_id = %run.run_id, score = ?summary.score, "✅ Run succeeded");
        }
        Err(e) => {
            let stage = e.failed_stage();
            error!(run_id = %run.run_id, stage = ?stage, "❌ Run failed: {}", e);
            ctx.store
                .finish_run(&run.run_id, RunStatus::Failed, stage.map(|s| s.as_str()))
                .await?;
            report.status = RunStatus::Failed;
            report.failed_stage = stage;
            report.error = Some(e.to_string());
        }
    }
    Ok(report)
}

async fn execute_stages(
    ctx: &RunContext<'_>,
    stage_ctx: StageContext<'_>,
    dataset: &Dataset,
) -> Result<StageSummary, DqError> {
    let scope = stage_ctx.scope;
    let mut summary = StageSummary::default();

    run_stage(Stage::Comparison, scope, async {
        run_comparison(stage_ctx).await?;
        if let Some(dir) = &ctx.options.export_dir {
            let results = stage_ctx.store.comparison_results(scope).await?;
            let path = comparison_export_path(dir, &dataset.dataset_name, scope)?;
            write_comparison_csv(&path, &results)?;
        }
        Ok::<(), DqError>(())
    })
    .await?;

    let classification = run_stage(
        Stage::Classification,
        scope,
        run_classification(stage_ctx, ctx.detectors),
    )
    .await?;
    summary.anomalies = classification.anomalies;
    summary.unclassified = classification.unclassified;

    run_stage(Stage::Aggregation, scope, run_aggregation(stage_ctx)).await?;

    let score = run_stage(Stage::Scoring, scope, run_scoring(stage_ctx)).await?;
    summary.score = Some(score.dq_score);

    run_stage(Stage::RootCause, scope, run_root_cause(stage_ctx)).await?;

    let alert = run_stage(
        Stage::Alerting,
        scope,
        run_alerting(stage_ctx, &dataset.dataset_name, ctx.sinks),
    )
    .await?;
    summary.alert = alert.map(|event| event.level);

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertEvent;
    use crate::domain::config::ThresholdsFile;
    use crate::domain::detection::ForeignKeyRelationship;
    use crate::domain::dimension::Dimension;
    use crate::domain::metric::{MetricKey, TABLE_LEVEL_COLUMN};
    use crate::domain::scoring::ScoreStatus;
    use crate::infrastructure::adapters::duckdb::DuckDBStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<AlertEvent>>>);

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn notify(&self, event: &AlertEvent) -> Result<(), DqError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn sink_name(&self) -> &str {
            "recording"
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn null_rate() -> MetricKey {
        MetricKey::new("orders", "email", "null_rate")
    }
    fn amount_mean() -> MetricKey {
        MetricKey::new("orders", "amount", "mean")
    }
    fn row_count() -> MetricKey {
        MetricKey::new("orders", TABLE_LEVEL_COLUMN, "row_count")
    }

    /// Two days of feeds: a clean 2024-03-30 and a degraded 2024-03-31.
    async fn seeded_store() -> Result<(DuckDBStore, Dataset)> {
        let store = DuckDBStore::new(":memory:")?;
        let dataset = store.register_dataset("orders", None).await?;
        let id = dataset.dataset_id;

        for (window_end, amount) in [("2024-03-10", "90"), ("2024-03-20", "110")] {
            store.insert_baseline_value(id, day(window_end), &null_rate(), "0.01")?;
            store.insert_baseline_value(id, day(window_end), &amount_mean(), amount)?;
            store.insert_baseline_value(id, day(window_end), &row_count(), "1000")?;
        }

        let clean = RunScope::new(id, day("2024-03-30"));
        store.insert_current_stat(clean, &null_rate(), "0.01")?;
        store.insert_current_stat(clean, &amount_mean(), "101")?;
        store.insert_current_stat(clean, &row_count(), "1000")?;

        let degraded = RunScope::new(id, day("2024-03-31"));
        store.insert_current_stat(degraded, &null_rate(), "0.07")?;
        store.insert_current_stat(degraded, &amount_mean(), "130")?;
        store.insert_current_stat(degraded, &row_count(), "1000")?;

        Ok((store, dataset))
    }

    fn config() -> QualityConfig {
        QualityConfig::freeze(ThresholdsFile::recommended()).unwrap()
    }

    #[tokio::test]
    async fn test_regression_is_scored_attributed_and_alerted() -> Result<()> {
        let (store, dataset) = seeded_store().await?;
        let events = Arc::new(Mutex::new(Vec::new()));
        let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(RecordingSink(events.clone()))];

        let reports = run_quality_pipeline(
            &store,
            &config(),
            &sinks,
            std::slice::from_ref(&dataset),
            &[day("2024-03-30"), day("2024-03-31")],
            &PipelineOptions::default(),
        )
        .await?;

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == RunStatus::Success));
        assert_eq!(reports[0].score, Some(100));
        assert_eq!(reports[0].alert, None);

        // completeness HIGH (15) + distribution HIGH (15)
        assert_eq!(reports[1].score, Some(70));
        assert_eq!(reports[1].anomalies, 2);
        assert_eq!(reports[1].alert, Some(AlertLevel::Warning));

        let degraded = RunScope::new(dataset.dataset_id, day("2024-03-31"));
        let score = store.score(degraded).await?.unwrap();
        assert_eq!(score.status, ScoreStatus::Warning);
        assert_eq!(score.top_issue, Some(Dimension::Completeness));

        let root_cause = store.root_cause(degraded).await?.unwrap();
        assert_eq!(
            root_cause.summary,
            "DQ score dropped from 100 to 70 due to completeness issues affecting columns: email"
        );

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].issue, Some(Dimension::Completeness));
        assert_eq!(events[0].summary, root_cause.summary);

        let runs = store.runs(dataset.dataset_id).await?;
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.status == RunStatus::Success && r.end_time.is_some()));
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_except_persistence() -> Result<()> {
        let (store, dataset) = seeded_store().await?;
        let dates = [day("2024-03-30"), day("2024-03-31")];
        let datasets = [dataset.clone()];

        let degraded = RunScope::new(dataset.dataset_id, day("2024-03-31"));
        let cfg = config();

        run_quality_pipeline(&store, &cfg, &[], &datasets, &dates, &PipelineOptions::default())
            .await?;
        let first = store.aggregates(degraded).await?;

        run_quality_pipeline(&store, &cfg, &[], &datasets, &dates, &PipelineOptions::default())
            .await?;

        let anomalies = store.open_anomalies(degraded).await?;
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies.iter().all(|a| a.persistence == 2));

        let aggregates = store.aggregates(degraded).await?;
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates, first);

        // Aggregation alone, twice more on the unchanged anomaly set
        let ctx = StageContext {
            store: &store,
            config: &cfg,
            scope: degraded,
        };
        for _ in 0..2 {
            assert_eq!(run_aggregation(ctx).await?, 2);
            assert_eq!(store.aggregates(degraded).await?, first);
        }
        assert_eq!(store.score_history(dataset.dataset_id, 10).await?.len(), 2);
        assert_eq!(store.comparison_results(degraded).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_failure_marks_run_failed_and_keeps_earlier_writes() -> Result<()> {
        let (store, dataset) = seeded_store().await?;
        let degraded = RunScope::new(dataset.dataset_id, day("2024-03-31"));
        store.insert_foreign_key(
            degraded,
            &ForeignKeyRelationship {
                child_table: "orders".into(),
                child_column: "customer_id".into(),
                parent_table: "customers".into(),
                parent_column: "id".into(),
                violation_rate: 1.7,
            },
        )?;

        let reports = run_quality_pipeline(
            &store,
            &config(),
            &[],
            &[dataset.clone()],
            &[day("2024-03-31")],
            &PipelineOptions::default(),
        )
        .await?;

        assert_eq!(reports[0].status, RunStatus::Failed);
        assert_eq!(reports[0].failed_stage, Some(Stage::Classification));

        let runs = store.runs(dataset.dataset_id).await?;
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].failed_stage.as_deref(), Some("classification"));

        // Comparison committed before the failure
        assert_eq!(store.comparison_results(degraded).await?.len(), 3);
        assert!(store.score(degraded).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_day_stops_later_dates() -> Result<()> {
        let (store, dataset) = seeded_store().await?;
        let clean = RunScope::new(dataset.dataset_id, day("2024-03-30"));
        store.insert_foreign_key(
            clean,
            &ForeignKeyRelationship {
                child_table: "orders".into(),
                child_column: "".into(),
                parent_table: "customers".into(),
                parent_column: "id".into(),
                violation_rate: 0.0,
            },
        )?;

        let reports = run_quality_pipeline(
            &store,
            &config(),
            &[],
            &[dataset],
            &[day("2024-03-30"), day("2024-03-31")],
            &PipelineOptions::default(),
        )
        .await?;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, RunStatus::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_first_run_without_baseline_is_clean() -> Result<()> {
        let store = DuckDBStore::new(":memory:")?;
        let dataset = store.register_dataset("events", None).await?;
        let scope = RunScope::new(dataset.dataset_id, day("2024-03-31"));
        store.insert_current_stat(scope, &MetricKey::new("events", "payload", "null_rate"), "0.5")?;

        let dir = tempfile::tempdir()?;
        let options = PipelineOptions {
            export_dir: Some(dir.path().to_path_buf()),
        };
        let reports =
            run_quality_pipeline(&store, &config(), &[], &[dataset], &[scope.run_date], &options)
                .await?;

        assert_eq!(reports[0].status, RunStatus::Success);
        assert_eq!(reports[0].score, Some(100));
        assert_eq!(reports[0].anomalies, 0);

        let csv = std::fs::read_to_string(dir.path().join("events/comparison_2024-03-31.csv"))?;
        assert!(csv.contains("events,payload,null_rate,NEW_METRIC,,0.5,,,"));
        Ok(())
    }

    #[tokio::test]
    async fn test_datasets_run_concurrently_and_report_sorted() -> Result<()> {
        let store = DuckDBStore::new(":memory:")?;
        let mut datasets = Vec::new();
        for name in ["zeta", "alpha", "mid"] {
            datasets.push(store.register_dataset(name, None).await?);
        }

        let reports = run_quality_pipeline(
            &store,
            &config(),
            &[],
            &datasets,
            &[day("2024-03-31")],
            &PipelineOptions::default(),
        )
        .await?;

        let names: Vec<_> = reports.iter().map(|r| r.dataset_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        Ok(())
    }
}
