// dqscore/src/commands/run.rs
//
// USE CASE: Run the quality pipeline for one or more datasets.

use anyhow::Context;
use chrono::NaiveDate;

use dqscore_core::application::{PipelineOptions, RunReport, resolve_datasets, run_quality_pipeline};
use dqscore_core::domain::run::{RunStatus, date_range};
use dqscore_core::infrastructure::adapters::sinks::{JsonLinesAlertSink, TracingAlertSink};
use dqscore_core::infrastructure::config::load_quality_config;
use dqscore_core::ports::AlertSink;

use crate::cli::RunArgs;
use crate::commands::open_store;

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let run_dates = run_dates(&args)?;

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    let config = load_quality_config(args.config.as_deref(), &cwd)
        .context("Failed to load quality thresholds")?;

    // B. Instantiate the adapters
    let store = open_store(&args.db_path)?;
    let mut sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(TracingAlertSink)];
    if let Some(path) = &args.alert_log {
        sinks.push(Box::new(JsonLinesAlertSink::new(path.clone())));
    }

    let datasets = resolve_datasets(&store, &args.dataset)
        .await
        .context("Failed to resolve datasets")?;
    println!(
        "   {} dataset(s) x {} date(s)",
        datasets.len(),
        run_dates.len()
    );

    // C. Run the Pipeline (Application Layer)
    let options = PipelineOptions {
        export_dir: args.export_dir.clone(),
    };
    let reports = run_quality_pipeline(&store, &config, &sinks, &datasets, &run_dates, &options)
        .await
        .context("Quality pipeline aborted")?;

    for report in &reports {
        println!("{}", render_report(report));
    }

    let failed = reports
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count();
    if failed > 0 {
        eprintln!("\n❌ FAILURE. {} run(s) failed.", failed);
        // Exit with error code for CI/CD
        std::process::exit(1);
    }

    println!("\n✨ SUCCESS! {} run(s) finished in {:.2?}", reports.len(), start.elapsed());
    Ok(())
}

fn run_dates(args: &RunArgs) -> anyhow::Result<Vec<NaiveDate>> {
    match (args.run_date, args.start_date, args.end_date) {
        (Some(day), _, _) => Ok(vec![day]),
        (None, Some(start), Some(end)) => Ok(date_range(start, end)?),
        _ => anyhow::bail!("Either --run-date or --start-date/--end-date is required"),
    }
}

fn render_report(report: &RunReport) -> String {
    match report.status {
        RunStatus::Failed => format!(
            "   ❌ {} {} failed at {}: {}",
            report.dataset_name,
            report.run_date,
            report
                .failed_stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string()),
            report.error.as_deref().unwrap_or("unknown error"),
        ),
        _ => {
            let score = report
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let alert = report
                .alert
                .map(|a| format!(" 🚨 {}", a))
                .unwrap_or_default();
            format!(
                "   ✅ {} {} score={} anomalies={} unclassified={}{}",
                report.dataset_name,
                report.run_date,
                score,
                report.anomalies,
                report.unclassified,
                alert
            )
        }
    }
}
