// dqscore-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use duckdb::{Config, Connection, params};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

// Imports Hexagonaux
use crate::domain::aggregation::AggregatedAnomaly;
use crate::domain::anomaly::{Anomaly, AnomalyObservation, AnomalyStatus};
use crate::domain::comparison::ComparisonResult;
use crate::domain::detection::{ForeignKeyRelationship, SchemaColumn};
use crate::domain::error::DomainError;
use crate::domain::metric::{BaselineStat, CurrentStat, MetricKey, parse_metric_value};
use crate::domain::root_cause::RootCause;
use crate::domain::run::{Dataset, RunRecord, RunScope, RunStatus};
use crate::domain::scoring::ScoreRecord;
use crate::error::DqError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::store::{FeedRead, QualityStore, SchemaSnapshots};

const DATE_FORMAT: &str = "%Y-%m-%d";

// Dates are stored as ISO text so lexical order is chronological order.
// Keys are enforced by the upsert statements below, not by constraints.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dq_datasets (
    dataset_id BIGINT NOT NULL,
    dataset_name VARCHAR NOT NULL,
    contract_path VARCHAR,
    created_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_run_history (
    run_id VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    dataset_name VARCHAR NOT NULL,
    run_date VARCHAR NOT NULL,
    start_time VARCHAR NOT NULL,
    end_time VARCHAR,
    status VARCHAR NOT NULL,
    failed_step VARCHAR
);

CREATE TABLE IF NOT EXISTS dq_current_stats (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    table_name VARCHAR NOT NULL,
    column_name VARCHAR NOT NULL,
    metric_name VARCHAR NOT NULL,
    metric_value VARCHAR,
    created_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_baseline_stats (
    dataset_id BIGINT NOT NULL,
    window_end VARCHAR NOT NULL,
    table_name VARCHAR NOT NULL,
    column_name VARCHAR NOT NULL,
    metric_name VARCHAR NOT NULL,
    metric_value VARCHAR
);

CREATE TABLE IF NOT EXISTS dq_schema_snapshot (
    dataset_id BIGINT NOT NULL,
    snapshot_date VARCHAR NOT NULL,
    table_name VARCHAR NOT NULL,
    column_name VARCHAR NOT NULL,
    data_type VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_foreign_keys (
    dataset_id BIGINT NOT NULL,
    run_date VARCHAR NOT NULL,
    child_table VARCHAR NOT NULL,
    child_column VARCHAR NOT NULL,
    parent_table VARCHAR NOT NULL,
    parent_column VARCHAR NOT NULL,
    violation_rate DOUBLE
);

CREATE TABLE IF NOT EXISTS dq_comparison_results (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    table_name VARCHAR NOT NULL,
    column_name VARCHAR NOT NULL,
    metric_name VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    baseline_mean DOUBLE,
    baseline_std DOUBLE,
    current_value DOUBLE NOT NULL,
    absolute_deviation DOUBLE,
    percentage_deviation DOUBLE,
    z_score DOUBLE,
    created_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_anomalies (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    dimension VARCHAR NOT NULL,
    table_name VARCHAR NOT NULL,
    column_name VARCHAR NOT NULL,
    metric_name VARCHAR NOT NULL,
    severity VARCHAR NOT NULL,
    deviation_percent DOUBLE,
    baseline_value DOUBLE,
    current_value DOUBLE,
    z_score DOUBLE,
    persistence BIGINT NOT NULL,
    status VARCHAR NOT NULL,
    explanation VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_aggregated_anomalies (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    dimension VARCHAR NOT NULL,
    table_name VARCHAR NOT NULL,
    dominant_severity VARCHAR NOT NULL,
    anomaly_count BIGINT NOT NULL,
    affected_columns VARCHAR NOT NULL,
    penalty_multiplier BIGINT NOT NULL,
    updated_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_score_history (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    dq_score BIGINT NOT NULL,
    status VARCHAR NOT NULL,
    top_issue VARCHAR,
    updated_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS dq_root_causes (
    run_date VARCHAR NOT NULL,
    dataset_id BIGINT NOT NULL,
    prev_score BIGINT NOT NULL,
    current_score BIGINT NOT NULL,
    dimension VARCHAR NOT NULL,
    columns VARCHAR NOT NULL,
    summary VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
"#;

pub struct DuckDBStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDBStore {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with the connection locked. Never called across an await.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, DqError>,
    ) -> Result<T, DqError> {
        let mut conn = self.conn.lock().map_err(|_| {
            DqError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "DuckDB Mutex Poisoned",
            )))
        })?;
        f(&mut conn)
    }

    // ── Feed writers ─────────────────────────────────────────────────
    // Feeds are produced by the profiling jobs. These writers exist for
    // seeding and tests.

    pub fn insert_current_stat(
        &self,
        scope: RunScope,
        key: &MetricKey,
        value: &str,
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dq_current_stats VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    scope.run_date.to_string(),
                    scope.dataset_id,
                    key.table,
                    key.column,
                    key.metric_name,
                    value,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_baseline_value(
        &self,
        dataset_id: i64,
        window_end: NaiveDate,
        key: &MetricKey,
        value: &str,
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dq_baseline_stats VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    dataset_id,
                    window_end.to_string(),
                    key.table,
                    key.column,
                    key.metric_name,
                    value
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_schema_column(
        &self,
        dataset_id: i64,
        snapshot_date: NaiveDate,
        column: &SchemaColumn,
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dq_schema_snapshot VALUES (?, ?, ?, ?, ?)",
                params![
                    dataset_id,
                    snapshot_date.to_string(),
                    column.table,
                    column.column,
                    column.data_type
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_foreign_key(
        &self,
        scope: RunScope,
        fk: &ForeignKeyRelationship,
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dq_foreign_keys VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    scope.dataset_id,
                    scope.run_date.to_string(),
                    fk.child_table,
                    fk.child_column,
                    fk.parent_table,
                    fk.parent_column,
                    fk.violation_rate
                ],
            )?;
            Ok(())
        })
    }
}

// ── Decoding helpers ─────────────────────────────────────────────────

fn decode_date(column: &str, raw: &str) -> Result<NaiveDate, DqError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        DqError::Infrastructure(InfrastructureError::Database(DatabaseError::Decode {
            column: column.to_string(),
            value: raw.to_string(),
        }))
    })
}

/// Labels (severity, dimension, statuses) fail loudly when unknown.
fn decode_label<T: FromStr<Err = DomainError>>(raw: &str) -> Result<T, DqError> {
    T::from_str(raw).map_err(DqError::Domain)
}

fn split_columns(raw: &str) -> Vec<String> {
    raw.split(", ")
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn query_scores(
    conn: &Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> Result<Vec<ScoreRecord>, DqError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (run_date, dataset_id, dq_score, status, top_issue) = row?;
        records.push(ScoreRecord {
            scope: RunScope::new(dataset_id, decode_date("run_date", &run_date)?),
            dq_score,
            status: decode_label(&status)?,
            top_issue: top_issue.as_deref().map(decode_label).transpose()?,
        });
    }
    Ok(records)
}

#[async_trait]
impl QualityStore for DuckDBStore {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn current_stats(&self, scope: RunScope) -> Result<FeedRead<Vec<CurrentStat>>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name, column_name, metric_name, metric_value
                 FROM dq_current_stats
                 WHERE dataset_id = ? AND run_date = ?
                 ORDER BY created_at",
            )?;
            let rows = stmt.query_map(params![scope.dataset_id, scope.run_date.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;

            // Later rows for the same key win
            let mut latest: BTreeMap<MetricKey, f64> = BTreeMap::new();
            let mut skipped = 0;
            for row in rows {
                let (table, column, metric, raw) = row?;
                match raw.as_deref().and_then(parse_metric_value) {
                    Some(value) => {
                        latest.insert(MetricKey::new(table, column, metric), value);
                    }
                    None => {
                        debug!(table = %table, column = %column, metric = %metric, raw = ?raw, "Skipping unparseable current value");
                        skipped += 1;
                    }
                }
            }

            Ok(FeedRead {
                data: latest
                    .into_iter()
                    .map(|(key, value)| CurrentStat { key, value })
                    .collect(),
                skipped,
            })
        })
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn baseline_stats(
        &self,
        scope: RunScope,
        window_days: u32,
    ) -> Result<FeedRead<HashMap<MetricKey, BaselineStat>>, DqError> {
        let FeedRead { data, skipped } = self.baseline_samples(scope, window_days).await?;
        let data = data
            .into_iter()
            .filter_map(|(key, values)| BaselineStat::from_samples(&values).map(|b| (key, b)))
            .collect();
        Ok(FeedRead { data, skipped })
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn baseline_samples(
        &self,
        scope: RunScope,
        window_days: u32,
    ) -> Result<FeedRead<HashMap<MetricKey, Vec<f64>>>, DqError> {
        let (from, to) = scope.baseline_window(window_days);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name, column_name, metric_name, metric_value
                 FROM dq_baseline_stats
                 WHERE dataset_id = ? AND window_end >= ? AND window_end <= ?
                 ORDER BY window_end",
            )?;
            let rows = stmt.query_map(
                params![scope.dataset_id, from.to_string(), to.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )?;

            let mut data: HashMap<MetricKey, Vec<f64>> = HashMap::new();
            let mut skipped = 0;
            for row in rows {
                let (table, column, metric, raw) = row?;
                match raw.as_deref().and_then(parse_metric_value) {
                    Some(value) => data
                        .entry(MetricKey::new(table, column, metric))
                        .or_default()
                        .push(value),
                    None => skipped += 1,
                }
            }

            Ok(FeedRead { data, skipped })
        })
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn schema_snapshots(&self, scope: RunScope) -> Result<SchemaSnapshots, DqError> {
        self.with_conn(|conn| {
            let run_date = scope.run_date.to_string();

            let mut bounds = conn.prepare(
                "SELECT MIN(snapshot_date), MAX(snapshot_date)
                 FROM dq_schema_snapshot
                 WHERE dataset_id = ? AND snapshot_date <= ?",
            )?;
            let mut rows = bounds.query_map(params![scope.dataset_id, run_date], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let (first, last) = match rows.next() {
                Some(row) => row?,
                None => (None, None),
            };
            drop(rows);

            let columns_at = |date: &str| -> Result<Vec<SchemaColumn>, DqError> {
                let mut stmt = conn.prepare(
                    "SELECT table_name, column_name, data_type
                     FROM dq_schema_snapshot
                     WHERE dataset_id = ? AND snapshot_date = ?
                     ORDER BY table_name, column_name",
                )?;
                let rows = stmt.query_map(params![scope.dataset_id, date], |row| {
                    Ok(SchemaColumn {
                        table: row.get(0)?,
                        column: row.get(1)?,
                        data_type: row.get(2)?,
                    })
                })?;
                let mut columns = Vec::new();
                for row in rows {
                    columns.push(row?);
                }
                Ok(columns)
            };

            let mut snapshots = SchemaSnapshots::default();
            if let Some(first) = first {
                snapshots.baseline = columns_at(&first)?;
                snapshots.baseline_date = Some(decode_date("snapshot_date", &first)?);
            }
            if let Some(last) = last {
                snapshots.current = columns_at(&last)?;
                snapshots.current_date = Some(decode_date("snapshot_date", &last)?);
            }
            Ok(snapshots)
        })
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn foreign_keys(&self, scope: RunScope) -> Result<Vec<ForeignKeyRelationship>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT child_table, child_column, parent_table, parent_column, violation_rate
                 FROM dq_foreign_keys
                 WHERE dataset_id = ? AND run_date = ?
                 ORDER BY child_table, child_column, parent_table, parent_column",
            )?;
            let rows = stmt.query_map(params![scope.dataset_id, scope.run_date.to_string()], |row| {
                Ok(ForeignKeyRelationship {
                    child_table: row.get(0)?,
                    child_column: row.get(1)?,
                    parent_table: row.get(2)?,
                    parent_column: row.get(3)?,
                    // A missing rate is rejected later as malformed
                    violation_rate: row.get::<_, Option<f64>>(4)?.unwrap_or(f64::NAN),
                })
            })?;
            let mut relationships = Vec::new();
            for row in rows {
                relationships.push(row?);
            }
            Ok(relationships)
        })
    }

    #[instrument(skip(self, results), fields(scope = %scope, rows = results.len()))]
    async fn replace_comparison_results(
        &self,
        scope: RunScope,
        results: &[ComparisonResult],
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            let run_date = scope.run_date.to_string();
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM dq_comparison_results WHERE dataset_id = ? AND run_date = ?",
                params![scope.dataset_id, run_date],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO dq_comparison_results VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )?;
                for r in results {
                    insert.execute(params![
                        run_date,
                        scope.dataset_id,
                        r.key.table,
                        r.key.column,
                        r.key.metric_name,
                        r.status.as_str(),
                        r.baseline_mean,
                        r.baseline_std,
                        r.current_value,
                        r.absolute_deviation,
                        r.percentage_deviation,
                        r.z_score,
                        now
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    async fn comparison_results(&self, scope: RunScope) -> Result<Vec<ComparisonResult>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name, column_name, metric_name, status, baseline_mean, baseline_std,
                        current_value, absolute_deviation, percentage_deviation, z_score
                 FROM dq_comparison_results
                 WHERE dataset_id = ? AND run_date = ?
                 ORDER BY table_name, column_name, metric_name",
            )?;
            let rows = stmt.query_map(params![scope.dataset_id, scope.run_date.to_string()], |row| {
                Ok((
                    MetricKey::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ),
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, Option<f64>>(7)?,
                    row.get::<_, Option<f64>>(8)?,
                    row.get::<_, Option<f64>>(9)?,
                ))
            })?;

            let mut results = Vec::new();
            for row in rows {
                let (key, status, mean, std, current, abs_dev, pct_dev, z) = row?;
                results.push(ComparisonResult {
                    key,
                    status: decode_label(&status)?,
                    baseline_mean: mean,
                    baseline_std: std,
                    current_value: current,
                    absolute_deviation: abs_dev,
                    percentage_deviation: pct_dev,
                    z_score: z,
                });
            }
            Ok(results)
        })
    }

    #[instrument(skip(self, observations), fields(rows = observations.len()))]
    async fn upsert_anomalies(&self, observations: &[AnomalyObservation]) -> Result<Vec<i64>, DqError> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            let mut persistence = Vec::with_capacity(observations.len());
            {
                let mut existing = tx.prepare(
                    "SELECT persistence FROM dq_anomalies
                     WHERE run_date = ? AND dataset_id = ? AND dimension = ?
                       AND table_name = ? AND column_name = ? AND metric_name = ?",
                )?;
                let mut update = tx.prepare(
                    "UPDATE dq_anomalies
                     SET severity = ?, deviation_percent = ?, baseline_value = ?, current_value = ?,
                         z_score = ?, persistence = ?, status = ?, explanation = ?, updated_at = ?
                     WHERE run_date = ? AND dataset_id = ? AND dimension = ?
                       AND table_name = ? AND column_name = ? AND metric_name = ?",
                )?;
                let mut insert = tx.prepare(
                    "INSERT INTO dq_anomalies VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )?;

                for obs in observations {
                    let run_date = obs.scope.run_date.to_string();
                    let dimension = obs.dimension.as_str();

                    let mut rows = existing.query_map(
                        params![
                            run_date,
                            obs.scope.dataset_id,
                            dimension,
                            obs.key.table,
                            obs.key.column,
                            obs.key.metric_name
                        ],
                        |row| row.get::<_, i64>(0),
                    )?;
                    let previous = match rows.next() {
                        Some(row) => Some(row?),
                        None => None,
                    };
                    drop(rows);

                    let count = match previous {
                        Some(previous) => {
                            let count = previous + 1;
                            update.execute(params![
                                obs.severity.as_str(),
                                obs.deviation_percent,
                                obs.baseline_value,
                                obs.current_value,
                                obs.z_score,
                                count,
                                AnomalyStatus::Open.as_str(),
                                obs.explanation,
                                now,
                                run_date,
                                obs.scope.dataset_id,
                                dimension,
                                obs.key.table,
                                obs.key.column,
                                obs.key.metric_name
                            ])?;
                            count
                        }
                        None => {
                            insert.execute(params![
                                run_date,
                                obs.scope.dataset_id,
                                dimension,
                                obs.key.table,
                                obs.key.column,
                                obs.key.metric_name,
                                obs.severity.as_str(),
                                obs.deviation_percent,
                                obs.baseline_value,
                                obs.current_value,
                                obs.z_score,
                                1_i64,
                                AnomalyStatus::Open.as_str(),
                                obs.explanation,
                                now,
                                now
                            ])?;
                            1
                        }
                    };
                    persistence.push(count);
                }
            }
            tx.commit()?;
            Ok(persistence)
        })
    }

    async fn open_anomalies(&self, scope: RunScope) -> Result<Vec<Anomaly>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT dimension, table_name, column_name, metric_name, severity, deviation_percent,
                        baseline_value, current_value, z_score, persistence, explanation,
                        created_at, updated_at
                 FROM dq_anomalies
                 WHERE dataset_id = ? AND run_date = ? AND status = ?
                 ORDER BY dimension, table_name, column_name, metric_name",
            )?;
            let rows = stmt.query_map(
                params![
                    scope.dataset_id,
                    scope.run_date.to_string(),
                    AnomalyStatus::Open.as_str()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        MetricKey::new(
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ),
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, Option<f64>>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                        row.get::<_, i64>(9)?,
                        row.get::<_, String>(10)?,
                        row.get::<_, String>(11)?,
                        row.get::<_, String>(12)?,
                    ))
                },
            )?;

            let mut anomalies = Vec::new();
            for row in rows {
                let (
                    dimension,
                    key,
                    severity,
                    deviation_percent,
                    baseline_value,
                    current_value,
                    z_score,
                    persistence,
                    explanation,
                    created_at,
                    updated_at,
                ) = row?;
                anomalies.push(Anomaly {
                    dataset_id: scope.dataset_id,
                    run_date: scope.run_date,
                    dimension: decode_label(&dimension)?,
                    key,
                    severity: decode_label(&severity)?,
                    deviation_percent,
                    baseline_value,
                    current_value,
                    z_score,
                    persistence,
                    status: AnomalyStatus::Open,
                    explanation,
                    created_at,
                    updated_at,
                });
            }
            Ok(anomalies)
        })
    }

    #[instrument(skip(self, aggregates), fields(scope = %scope, rows = aggregates.len()))]
    async fn upsert_aggregates(
        &self,
        scope: RunScope,
        aggregates: &[AggregatedAnomaly],
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            let run_date = scope.run_date.to_string();
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            {
                let mut update = tx.prepare(
                    "UPDATE dq_aggregated_anomalies
                     SET dominant_severity = ?, anomaly_count = ?, affected_columns = ?,
                         penalty_multiplier = ?, updated_at = ?
                     WHERE run_date = ? AND dataset_id = ? AND dimension = ? AND table_name = ?",
                )?;
                let mut insert = tx.prepare(
                    "INSERT INTO dq_aggregated_anomalies VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )?;
                for agg in aggregates {
                    let updated = update.execute(params![
                        agg.dominant_severity.as_str(),
                        agg.anomaly_count,
                        agg.affected_columns,
                        agg.penalty_multiplier,
                        now,
                        run_date,
                        scope.dataset_id,
                        agg.dimension.as_str(),
                        agg.table
                    ])?;
                    if updated == 0 {
                        insert.execute(params![
                            run_date,
                            scope.dataset_id,
                            agg.dimension.as_str(),
                            agg.table,
                            agg.dominant_severity.as_str(),
                            agg.anomaly_count,
                            agg.affected_columns,
                            agg.penalty_multiplier,
                            now
                        ])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    async fn aggregates(&self, scope: RunScope) -> Result<Vec<AggregatedAnomaly>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT dimension, table_name, dominant_severity, anomaly_count, affected_columns,
                        penalty_multiplier
                 FROM dq_aggregated_anomalies
                 WHERE dataset_id = ? AND run_date = ?
                 ORDER BY dimension, table_name",
            )?;
            let rows = stmt.query_map(params![scope.dataset_id, scope.run_date.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?;

            let mut aggregates = Vec::new();
            for row in rows {
                let (dimension, table, severity, count, columns, multiplier) = row?;
                aggregates.push(AggregatedAnomaly {
                    dimension: decode_label(&dimension)?,
                    table,
                    dominant_severity: decode_label(&severity)?,
                    anomaly_count: count,
                    affected_columns: columns,
                    penalty_multiplier: multiplier,
                });
            }
            Ok(aggregates)
        })
    }

    #[instrument(skip(self, record), fields(scope = %record.scope, score = record.dq_score))]
    async fn upsert_score(&self, record: &ScoreRecord) -> Result<(), DqError> {
        self.with_conn(|conn| {
            let run_date = record.scope.run_date.to_string();
            let top_issue = record.top_issue.map(|d| d.as_str());
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE dq_score_history SET dq_score = ?, status = ?, top_issue = ?, updated_at = ?
                 WHERE run_date = ? AND dataset_id = ?",
                params![
                    record.dq_score,
                    record.status.as_str(),
                    top_issue,
                    now,
                    run_date,
                    record.scope.dataset_id
                ],
            )?;
            if updated == 0 {
                tx.execute(
                    "INSERT INTO dq_score_history VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        run_date,
                        record.scope.dataset_id,
                        record.dq_score,
                        record.status.as_str(),
                        top_issue,
                        now
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    async fn score(&self, scope: RunScope) -> Result<Option<ScoreRecord>, DqError> {
        self.with_conn(|conn| {
            let records = query_scores(
                conn,
                "SELECT run_date, dataset_id, dq_score, status, top_issue
                 FROM dq_score_history
                 WHERE dataset_id = ? AND run_date = ?",
                params![scope.dataset_id, scope.run_date.to_string()],
            )?;
            Ok(records.into_iter().next())
        })
    }

    async fn latest_score(
        &self,
        dataset_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<ScoreRecord>, DqError> {
        self.with_conn(|conn| {
            let records = query_scores(
                conn,
                "SELECT run_date, dataset_id, dq_score, status, top_issue
                 FROM dq_score_history
                 WHERE dataset_id = ? AND run_date <= ?
                 ORDER BY run_date DESC
                 LIMIT 1",
                params![dataset_id, as_of.to_string()],
            )?;
            Ok(records.into_iter().next())
        })
    }

    async fn score_history(&self, dataset_id: i64, limit: usize) -> Result<Vec<ScoreRecord>, DqError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT run_date, dataset_id, dq_score, status, top_issue
                 FROM dq_score_history
                 WHERE dataset_id = ?
                 ORDER BY run_date DESC
                 LIMIT {}",
                limit
            );
            query_scores(conn, &sql, params![dataset_id])
        })
    }

    #[instrument(skip(self, root_cause), fields(scope = %root_cause.scope))]
    async fn insert_root_cause(&self, root_cause: &RootCause) -> Result<bool, DqError> {
        self.with_conn(|conn| {
            let run_date = root_cause.scope.run_date.to_string();
            let tx = conn.transaction()?;
            let exists = {
                let mut stmt = tx.prepare(
                    "SELECT COUNT(*) FROM dq_root_causes WHERE run_date = ? AND dataset_id = ?",
                )?;
                let mut rows = stmt.query_map(params![run_date, root_cause.scope.dataset_id], |row| {
                    row.get::<_, i64>(0)
                })?;
                match rows.next() {
                    Some(count) => count? > 0,
                    None => false,
                }
            };
            if exists {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO dq_root_causes VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    run_date,
                    root_cause.scope.dataset_id,
                    root_cause.prev_score,
                    root_cause.current_score,
                    root_cause.dimension.as_str(),
                    root_cause.columns.join(", "),
                    root_cause.summary,
                    Utc::now().to_rfc3339()
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    async fn root_cause(&self, scope: RunScope) -> Result<Option<RootCause>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT prev_score, current_score, dimension, columns, summary
                 FROM dq_root_causes
                 WHERE dataset_id = ? AND run_date = ?
                 LIMIT 1",
            )?;
            let mut rows = stmt.query_map(params![scope.dataset_id, scope.run_date.to_string()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let Some(row) = rows.next() else {
                return Ok(None);
            };
            let (prev_score, current_score, dimension, columns, summary) = row?;
            Ok(Some(RootCause {
                scope,
                prev_score,
                current_score,
                dimension: decode_label(&dimension)?,
                columns: split_columns(&columns),
                summary,
            }))
        })
    }

    #[instrument(skip(self))]
    async fn register_dataset(
        &self,
        name: &str,
        contract_path: Option<&str>,
    ) -> Result<Dataset, DqError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let existing = {
                let mut stmt = tx.prepare(
                    "SELECT dataset_id, contract_path FROM dq_datasets WHERE dataset_name = ?",
                )?;
                let mut rows = stmt.query_map(params![name], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
                })?;
                match rows.next() {
                    Some(row) => Some(row?),
                    None => None,
                }
            };

            let dataset = match existing {
                Some((dataset_id, stored_path)) => Dataset {
                    dataset_id,
                    dataset_name: name.to_string(),
                    contract_path: stored_path,
                },
                None => {
                    let mut next = tx.prepare("SELECT COALESCE(MAX(dataset_id), 0) + 1 FROM dq_datasets")?;
                    let mut ids = next.query_map([], |row| row.get::<_, i64>(0))?;
                    let dataset_id = match ids.next() {
                        Some(id) => id?,
                        None => 1,
                    };
                    drop(ids);
                    drop(next);

                    tx.execute(
                        "INSERT INTO dq_datasets VALUES (?, ?, ?, ?)",
                        params![dataset_id, name, contract_path, Utc::now().to_rfc3339()],
                    )?;
                    debug!(dataset_id, "Registered new dataset");
                    Dataset {
                        dataset_id,
                        dataset_name: name.to_string(),
                        contract_path: contract_path.map(str::to_string),
                    }
                }
            };
            tx.commit()?;
            Ok(dataset)
        })
    }

    async fn find_dataset(&self, name: &str) -> Result<Option<Dataset>, DqError> {
        Ok(self
            .datasets()
            .await?
            .into_iter()
            .find(|d| d.dataset_name == name))
    }

    async fn datasets(&self) -> Result<Vec<Dataset>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT dataset_id, dataset_name, contract_path FROM dq_datasets ORDER BY dataset_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Dataset {
                    dataset_id: row.get(0)?,
                    dataset_name: row.get(1)?,
                    contract_path: row.get(2)?,
                })
            })?;
            let mut datasets = Vec::new();
            for row in rows {
                datasets.push(row?);
            }
            Ok(datasets)
        })
    }

    async fn start_run(&self, run: &RunRecord) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dq_run_history VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    run.run_id,
                    run.dataset_id,
                    run.dataset_name,
                    run.run_date.to_string(),
                    run.start_time,
                    run.end_time,
                    run.status.as_str(),
                    run.failed_stage
                ],
            )?;
            Ok(())
        })
    }

    async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        failed_stage: Option<&str>,
    ) -> Result<(), DqError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE dq_run_history SET status = ?, failed_step = ?, end_time = ? WHERE run_id = ?",
                params![status.as_str(), failed_stage, Utc::now().to_rfc3339(), run_id],
            )?;
            Ok(())
        })
    }

    async fn runs(&self, dataset_id: i64) -> Result<Vec<RunRecord>, DqError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, dataset_name, run_date, start_time, end_time, status, failed_step
                 FROM dq_run_history
                 WHERE dataset_id = ?
                 ORDER BY start_time",
            )?;
            let rows = stmt.query_map(params![dataset_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?;

            let mut runs = Vec::new();
            for row in rows {
                let (run_id, dataset_name, run_date, start_time, end_time, status, failed_stage) = row?;
                runs.push(RunRecord {
                    run_id,
                    dataset_id,
                    dataset_name,
                    run_date: decode_date("run_date", &run_date)?,
                    start_time,
                    end_time,
                    status: decode_label(&status)?,
                    failed_stage,
                });
            }
            Ok(runs)
        })
    }
}
