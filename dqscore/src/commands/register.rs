// dqscore/src/commands/register.rs
//
// USE CASE: Register a dataset (idempotent).

use anyhow::Context;

use dqscore_core::application::register_dataset;

use crate::commands::open_store;

pub async fn execute(db_path: &str, name: &str, contract: Option<&str>) -> anyhow::Result<()> {
    let store = open_store(db_path)?;
    let dataset = register_dataset(&store, name, contract)
        .await
        .with_context(|| format!("Failed to register dataset '{}'", name))?;

    println!(
        "📇 {} -> dataset_id={}",
        dataset.dataset_name, dataset.dataset_id
    );
    Ok(())
}
