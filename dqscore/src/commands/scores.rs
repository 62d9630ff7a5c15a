// dqscore/src/commands/scores.rs
//
// USE CASE: Show the score history of a dataset.

use anyhow::Context;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use dqscore_core::domain::scoring::ScoreRecord;
use dqscore_core::ports::QualityStore;

use crate::commands::open_existing_store;

pub async fn execute(db_path: &str, dataset: &str, limit: usize) -> anyhow::Result<()> {
    let store = open_existing_store(db_path)?;
    let Some(found) = store.find_dataset(dataset).await? else {
        anyhow::bail!("Unknown dataset '{}'", dataset);
    };

    let history = store
        .score_history(found.dataset_id, limit)
        .await
        .with_context(|| format!("Failed to read scores of '{}'", dataset))?;

    if history.is_empty() {
        println!("No scores recorded for '{}' yet.", dataset);
        return Ok(());
    }

    println!("{}", render_scores(&history));
    Ok(())
}

fn render_scores(history: &[ScoreRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["run_date", "dq_score", "status", "top_issue"]);
    for record in history {
        table.add_row(vec![
            record.scope.run_date.to_string(),
            record.dq_score.to_string(),
            record.status.to_string(),
            record
                .top_issue
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}
