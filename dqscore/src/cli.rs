// dqscore/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "dqscore.duckdb";
pub const DEFAULT_AUDIT_OUTPUT: &str = "baseline_audit_summary.csv";

#[derive(Parser)]
#[command(name = "dqscore")]
#[command(about = "Data-quality anomaly scoring, root cause attribution and alerting", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the quality pipeline (compare -> classify -> score -> alert)
    Run(RunArgs),

    /// 📇 Registers a dataset and prints its id
    Register {
        name: String,

        /// Path to the dataset's contract file
        #[arg(long)]
        contract: Option<String>,

        #[arg(long, env = "DQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },

    /// 📈 Shows the score history of a dataset, newest first
    Scores {
        #[arg(long, short)]
        dataset: String,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(long, env = "DQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },

    /// 🔎 Lists the open anomalies of a dataset for one run date
    Anomalies {
        #[arg(long, short)]
        dataset: String,

        #[arg(long)]
        run_date: NaiveDate,

        #[arg(long, env = "DQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },

    /// 🧪 Summarizes the baseline window a run would compare against
    BaselineAudit(BaselineAuditArgs),

    /// ✅ Loads and validates the thresholds file
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dataset to score (repeatable)
    #[arg(long, short, required = true)]
    pub dataset: Vec<String>,

    /// Single run date (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["start_date", "end_date"], required_unless_present = "start_date")]
    pub run_date: Option<NaiveDate>,

    /// First date of an inclusive range
    #[arg(long, requires = "end_date")]
    pub start_date: Option<NaiveDate>,

    /// Last date of an inclusive range
    #[arg(long, requires = "start_date")]
    pub end_date: Option<NaiveDate>,

    #[arg(long, env = "DQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Thresholds file (defaults to $DQ_CONFIG_PATH, then ./dq_thresholds.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Writes comparison_<date>.csv per dataset under this directory
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Appends every alert as one JSON line to this file
    #[arg(long)]
    pub alert_log: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BaselineAuditArgs {
    /// Registered dataset to audit (repeatable)
    #[arg(long, short, required = true)]
    pub dataset: Vec<String>,

    /// Run date whose trailing window is audited (defaults to today, UTC)
    #[arg(long)]
    pub run_date: Option<NaiveDate>,

    /// Summary CSV, one row per dataset with baseline data
    #[arg(long, short, default_value = DEFAULT_AUDIT_OUTPUT)]
    pub output: PathBuf,

    #[arg(long, env = "DQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Thresholds file, read for the baseline window length
    #[arg(long)]
    pub config: Option<PathBuf>,
}
