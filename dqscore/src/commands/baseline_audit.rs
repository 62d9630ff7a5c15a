// dqscore/src/commands/baseline_audit.rs
//
// USE CASE: Sanity-check the baseline window before trusting a run.

use anyhow::Context;
use chrono::Utc;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use dqscore_core::application::audit_baseline;
use dqscore_core::domain::baseline_audit::BaselineAudit;
use dqscore_core::infrastructure::config::load_quality_config;
use dqscore_core::infrastructure::export::write_baseline_audit_csv;
use dqscore_core::ports::QualityStore;

use crate::cli::BaselineAuditArgs;
use crate::commands::open_existing_store;

pub async fn execute(args: BaselineAuditArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    let config = load_quality_config(args.config.as_deref(), &cwd)
        .context("Failed to load quality thresholds")?;
    let store = open_existing_store(&args.db_path)?;
    let audit_date = args.run_date.unwrap_or_else(|| Utc::now().date_naive());

    let mut audits = Vec::with_capacity(args.dataset.len());
    for name in &args.dataset {
        // Read-only: unknown names are not registered here
        let Some(dataset) = store.find_dataset(name.trim()).await? else {
            anyhow::bail!("Unknown dataset '{}'", name);
        };
        match audit_baseline(&store, &config, &dataset, audit_date)
            .await
            .with_context(|| format!("Failed to audit the baseline of '{}'", name))?
        {
            Some(audit) => audits.push(audit),
            None => println!("No baseline data found for '{}'", dataset.dataset_name),
        }
    }

    if audits.is_empty() {
        return Ok(());
    }

    println!("{}", render_audits(&audits));
    write_baseline_audit_csv(&args.output, &audits)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("📄 Baseline audit written to {}", args.output.display());
    Ok(())
}

fn num(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn render_audits(audits: &[BaselineAudit]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "dataset",
        "window",
        "samples",
        "skipped",
        "avg_null_rate",
        "avg_record_count",
        "mean (min..max)",
        "std_dev (min..max)",
    ]);
    for a in audits {
        table.add_row(vec![
            a.dataset_name.clone(),
            format!("{}..{}", a.window_start, a.window_end),
            a.samples.to_string(),
            a.skipped.to_string(),
            num(a.avg_null_rate),
            num(a.avg_record_count),
            format!("{}..{}", num(a.min_mean), num(a.max_mean)),
            format!("{}..{}", num(a.min_std_dev), num(a.max_std_dev)),
        ]);
    }
    table
}
