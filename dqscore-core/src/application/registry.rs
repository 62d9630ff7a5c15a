// dqscore-core/src/application/registry.rs

use tracing::{info, instrument};

use crate::domain::run::Dataset;
use crate::error::DqError;
use crate::ports::store::QualityStore;

/// Registers the dataset on first use and returns its stable id.
#[instrument(skip(store))]
pub async fn register_dataset(
    store: &dyn QualityStore,
    name: &str,
    contract_path: Option<&str>,
) -> Result<Dataset, DqError> {
    let name = name.trim();
    Dataset::validate_name(name)?;
    let dataset = store.register_dataset(name, contract_path).await?;
    info!(dataset_id = dataset.dataset_id, "📇 Dataset resolved");
    Ok(dataset)
}

/// Resolves every name once, in the order given.
pub async fn resolve_datasets(
    store: &dyn QualityStore,
    names: &[String],
) -> Result<Vec<Dataset>, DqError> {
    let mut datasets: Vec<Dataset> = Vec::with_capacity(names.len());
    for name in names {
        if datasets.iter().any(|d| d.dataset_name == name.trim()) {
            continue;
        }
        datasets.push(register_dataset(store, name, None).await?);
    }
    Ok(datasets)
}
