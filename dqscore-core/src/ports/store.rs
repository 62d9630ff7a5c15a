// dqscore-core/src/ports/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::aggregation::AggregatedAnomaly;
use crate::domain::anomaly::{Anomaly, AnomalyObservation};
use crate::domain::comparison::ComparisonResult;
use crate::domain::detection::{ForeignKeyRelationship, SchemaColumn};
use crate::domain::metric::{BaselineStat, CurrentStat, MetricKey};
use crate::domain::root_cause::RootCause;
use crate::domain::run::{Dataset, RunRecord, RunScope, RunStatus};
use crate::domain::scoring::ScoreRecord;
use crate::error::DqError;

/// A feed read where unreadable rows were skipped instead of failing the read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedRead<T> {
    pub data: T,
    pub skipped: usize,
}

/// Earliest snapshot for the dataset vs the latest one at or before the run date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaSnapshots {
    pub baseline_date: Option<NaiveDate>,
    pub baseline: Vec<SchemaColumn>,
    pub current_date: Option<NaiveDate>,
    pub current: Vec<SchemaColumn>,
}

/// Durable storage for the feeds the engine consumes and the records it produces.
/// Every write method commits before returning.
#[async_trait]
pub trait QualityStore: Send + Sync {
    // --- Feeds ---
    async fn current_stats(&self, scope: RunScope) -> Result<FeedRead<Vec<CurrentStat>>, DqError>;

    /// Population mean/std per key over `[run_date - window_days, run_date - 1]`.
    async fn baseline_stats(
        &self,
        scope: RunScope,
        window_days: u32,
    ) -> Result<FeedRead<HashMap<MetricKey, BaselineStat>>, DqError>;

    /// Parsed values per key over the same window as `baseline_stats`, oldest first.
    async fn baseline_samples(
        &self,
        scope: RunScope,
        window_days: u32,
    ) -> Result<FeedRead<HashMap<MetricKey, Vec<f64>>>, DqError>;

    async fn schema_snapshots(&self, scope: RunScope) -> Result<SchemaSnapshots, DqError>;

    async fn foreign_keys(&self, scope: RunScope) -> Result<Vec<ForeignKeyRelationship>, DqError>;

    // --- Comparison ---
    /// Replaces every comparison row of the scope.
    async fn replace_comparison_results(
        &self,
        scope: RunScope,
        results: &[ComparisonResult],
    ) -> Result<(), DqError>;

    async fn comparison_results(&self, scope: RunScope) -> Result<Vec<ComparisonResult>, DqError>;

    // --- Anomalies ---
    /// Upserts every observation in one transaction and returns the resulting
    /// persistence counters, in input order.
    async fn upsert_anomalies(&self, observations: &[AnomalyObservation]) -> Result<Vec<i64>, DqError>;

    async fn open_anomalies(&self, scope: RunScope) -> Result<Vec<Anomaly>, DqError>;

    async fn upsert_aggregates(
        &self,
        scope: RunScope,
        aggregates: &[AggregatedAnomaly],
    ) -> Result<(), DqError>;

    async fn aggregates(&self, scope: RunScope) -> Result<Vec<AggregatedAnomaly>, DqError>;

    // --- Scores ---
    async fn upsert_score(&self, record: &ScoreRecord) -> Result<(), DqError>;

    async fn score(&self, scope: RunScope) -> Result<Option<ScoreRecord>, DqError>;

    /// Most recent score at or before `as_of`.
    async fn latest_score(&self, dataset_id: i64, as_of: NaiveDate) -> Result<Option<ScoreRecord>, DqError>;

    /// Newest first.
    async fn score_history(&self, dataset_id: i64, limit: usize) -> Result<Vec<ScoreRecord>, DqError>;

    // --- Root causes ---
    /// Returns false when a root cause already exists for the scope.
    async fn insert_root_cause(&self, root_cause: &RootCause) -> Result<bool, DqError>;

    async fn root_cause(&self, scope: RunScope) -> Result<Option<RootCause>, DqError>;

    // --- Registry ---
    /// Returns the existing dataset when the name is already registered.
    async fn register_dataset(&self, name: &str, contract_path: Option<&str>) -> Result<Dataset, DqError>;

    async fn find_dataset(&self, name: &str) -> Result<Option<Dataset>, DqError>;

    async fn datasets(&self) -> Result<Vec<Dataset>, DqError>;

    // --- Run history ---
    async fn start_run(&self, run: &RunRecord) -> Result<(), DqError>;

    async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        failed_stage: Option<&str>,
    ) -> Result<(), DqError>;

    async fn runs(&self, dataset_id: i64) -> Result<Vec<RunRecord>, DqError>;
}
