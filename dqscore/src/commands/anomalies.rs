// dqscore/src/commands/anomalies.rs
//
// USE CASE: List the open anomalies of one run.

use chrono::NaiveDate;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use dqscore_core::domain::RunScope;
use dqscore_core::domain::anomaly::Anomaly;
use dqscore_core::ports::QualityStore;

use crate::commands::open_existing_store;

pub async fn execute(db_path: &str, dataset: &str, run_date: NaiveDate) -> anyhow::Result<()> {
    let store = open_existing_store(db_path)?;
    let Some(found) = store.find_dataset(dataset).await? else {
        anyhow::bail!("Unknown dataset '{}'", dataset);
    };

    let scope = RunScope::new(found.dataset_id, run_date);
    let anomalies = store.open_anomalies(scope).await?;
    if anomalies.is_empty() {
        println!("No open anomalies for '{}' on {}.", dataset, run_date);
        return Ok(());
    }

    println!("{}", render_anomalies(&anomalies));
    if let Some(root_cause) = store.root_cause(scope).await? {
        println!("🧭 {}", root_cause.summary);
    }
    Ok(())
}

fn render_anomalies(anomalies: &[Anomaly]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "dimension",
        "table",
        "column",
        "metric",
        "severity",
        "persistence",
        "explanation",
    ]);
    for a in anomalies {
        table.add_row(vec![
            a.dimension.to_string(),
            a.key.table.clone(),
            a.key.column.clone(),
            a.key.metric_name.clone(),
            a.severity.to_string(),
            a.persistence.to_string(),
            a.explanation.clone(),
        ]);
    }
    table
}
