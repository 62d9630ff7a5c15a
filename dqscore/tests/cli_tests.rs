use anyhow::Result;
use assert_cmd::prelude::*;
use chrono::NaiveDate;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

use dqscore_core::domain::RunScope;
use dqscore_core::domain::detection::ForeignKeyRelationship;
use dqscore_core::domain::metric::MetricKey;
use dqscore_core::infrastructure::adapters::duckdb::DuckDBStore;
use dqscore_core::ports::QualityStore;

const THRESHOLDS: &str = r#"
dimensions:
  completeness: { weight: 25 }
  volume: { weight: 20 }
  distribution: { weight: 20 }
  schema: { weight: 20 }
  referential: { weight: 15 }
severity_penalty: { LOW: 5, MEDIUM: 10, HIGH: 15 }
alerts: { warning_score: 90, critical_score: 70 }
"#;

/// A scratch working directory with a thresholds file and a DuckDB file.
struct DqTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl DqTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().to_path_buf();
        std::fs::write(root.join("dq_thresholds.yaml"), THRESHOLDS)?;
        Ok(Self { _tmp: tmp, root })
    }

    fn db_path(&self) -> String {
        self.root.join("dq.duckdb").to_string_lossy().into_owned()
    }

    /// Seeds a clean 2024-03-30 and a degraded 2024-03-31 for "orders".
    /// The store is dropped before returning so the binary can open the file.
    async fn seed_orders(&self) -> Result<i64> {
        let store = DuckDBStore::new(&self.db_path())?;
        let dataset = store.register_dataset("orders", None).await?;
        let id = dataset.dataset_id;

        let null_rate = MetricKey::new("orders", "email", "null_rate");
        let amount = MetricKey::new("orders", "amount", "mean");
        for (window_end, mean) in [("2024-03-10", "90"), ("2024-03-20", "110")] {
            let window_end = day(window_end);
            store.insert_baseline_value(id, window_end, &null_rate, "0.01")?;
            store.insert_baseline_value(id, window_end, &amount, mean)?;
        }

        let clean = RunScope::new(id, day("2024-03-30"));
        store.insert_current_stat(clean, &null_rate, "0.01")?;
        store.insert_current_stat(clean, &amount, "101")?;

        let degraded = RunScope::new(id, day("2024-03-31"));
        store.insert_current_stat(degraded, &null_rate, "0.07")?;
        store.insert_current_stat(degraded, &amount, "130")?;
        Ok(id)
    }

    fn dqscore(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dqscore"));
        cmd.current_dir(&self.root)
            .env_remove("DQ_CONFIG_PATH")
            .env_remove("DQ_WARNING_SCORE")
            .env_remove("DQ_CRITICAL_SCORE")
            .env("DQ_DB_PATH", self.db_path());
        cmd
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

#[test]
fn test_check_config_accepts_valid_file() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.dqscore()
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("completeness  weight=25"));
    Ok(())
}

#[test]
fn test_check_config_rejects_inverted_alerts() -> Result<()> {
    let env = DqTestEnv::new()?;
    std::fs::write(
        env.root.join("broken.yaml"),
        THRESHOLDS.replace("critical_score: 70", "critical_score: 95"),
    )?;
    env.dqscore()
        .args(["check-config", "--config", "broken.yaml"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_env_override_is_validated() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.dqscore()
        .arg("check-config")
        .env("DQ_CRITICAL_SCORE", "not-a-number")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_register_is_idempotent() -> Result<()> {
    let env = DqTestEnv::new()?;
    for _ in 0..2 {
        env.dqscore()
            .args(["register", "orders"])
            .assert()
            .success()
            .stdout(predicate::str::contains("orders -> dataset_id=1"));
    }
    Ok(())
}

#[tokio::test]
async fn test_run_range_scores_alerts_and_exports() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.seed_orders().await?;

    env.dqscore()
        .args([
            "run",
            "--dataset",
            "orders",
            "--start-date",
            "2024-03-30",
            "--end-date",
            "2024-03-31",
            "--export-dir",
            "exports",
            "--alert-log",
            "alerts.jsonl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("orders 2024-03-30 score=100"))
        .stdout(predicate::str::contains("orders 2024-03-31 score=70"))
        .stdout(predicate::str::contains("WARNING"));

    let alerts = std::fs::read_to_string(env.root.join("alerts.jsonl"))?;
    assert_eq!(alerts.lines().count(), 1);
    assert!(alerts.contains("\"level\":\"WARNING\""));
    assert!(alerts.contains("completeness issues affecting columns: email"));

    assert!(env.root.join("exports/orders/comparison_2024-03-30.csv").exists());
    assert!(env.root.join("exports/orders/comparison_2024-03-31.csv").exists());

    env.dqscore()
        .args(["scores", "--dataset", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-31"))
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("completeness"));

    env.dqscore()
        .args(["anomalies", "--dataset", "orders", "--run-date", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("email"))
        .stdout(predicate::str::contains("DQ score dropped from 100 to 70"));
    Ok(())
}

#[tokio::test]
async fn test_failed_run_exits_non_zero() -> Result<()> {
    let env = DqTestEnv::new()?;
    let id = env.seed_orders().await?;
    {
        let store = DuckDBStore::new(&env.db_path())?;
        store.insert_foreign_key(
            RunScope::new(id, day("2024-03-31")),
            &ForeignKeyRelationship {
                child_table: "orders".into(),
                child_column: "customer_id".into(),
                parent_table: "customers".into(),
                parent_column: "id".into(),
                violation_rate: 1.7,
            },
        )?;
    }

    env.dqscore()
        .args(["run", "-d", "orders", "--run-date", "2024-03-31"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed at classification"))
        .stderr(predicate::str::contains("FAILURE"));
    Ok(())
}

#[test]
fn test_scores_without_database_fails() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.dqscore()
        .args(["scores", "--dataset", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Database not found"));
    Ok(())
}

#[tokio::test]
async fn test_baseline_audit_writes_summary_csv() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.seed_orders().await?;

    env.dqscore()
        .args([
            "baseline-audit",
            "-d",
            "orders",
            "--run-date",
            "2024-03-31",
            "--output",
            "audit/summary.csv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-01..2024-03-30"))
        .stdout(predicate::str::contains("Baseline audit written"));

    let csv = std::fs::read_to_string(env.root.join("audit/summary.csv"))?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "dataset,audit_run_date,window_start,window_end,samples,skipped,avg_null_rate,avg_record_count,min_mean,max_mean,min_std_dev,max_std_dev",
            "orders,2024-03-31,2024-03-01,2024-03-30,4,0,0.01,,90,110,,",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_baseline_audit_without_window_data_writes_nothing() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.seed_orders().await?;

    // The seeded baseline ends on 2024-03-20
    env.dqscore()
        .args(["baseline-audit", "-d", "orders", "--run-date", "2024-06-30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No baseline data found for 'orders'"));
    assert!(!env.root.join("baseline_audit_summary.csv").exists());
    Ok(())
}

#[test]
fn test_register_rejects_path_like_names() -> Result<()> {
    let env = DqTestEnv::new()?;
    env.dqscore()
        .args(["register", "../escape"])
        .assert()
        .failure();
    Ok(())
}
