// dqscore-core/src/domain/detection/schema.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::detection::{AnomalyCandidate, DetectorKind, Signal};
use crate::domain::dimension::Dimension;
use crate::domain::metric::MetricKey;
use crate::domain::severity::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaChange {
    ColumnAdded,
    ColumnRemoved,
    TypeChanged,
}

impl SchemaChange {
    /// Removing or retyping a column breaks consumers, adding one does not.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ColumnRemoved | Self::TypeChanged => Severity::High,
            Self::ColumnAdded => Severity::Low,
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::ColumnAdded => "schema_column_added",
            Self::ColumnRemoved => "schema_column_removed",
            Self::TypeChanged => "schema_type_changed",
        }
    }
}

/// Diffs the current snapshot against the baseline one.
/// Types are compared case-insensitively (`VARCHAR` == `varchar`).
pub fn schema_drift(baseline: &[SchemaColumn], current: &[SchemaColumn]) -> Vec<AnomalyCandidate> {
    let index = |cols: &[SchemaColumn]| -> BTreeMap<(String, String), String> {
        cols.iter()
            .map(|c| ((c.table.clone(), c.column.clone()), c.data_type.trim().to_string()))
            .collect()
    };
    let before = index(baseline);
    let after = index(current);

    let mut changes = Vec::new();

    for ((table, column), base_type) in &before {
        match after.get(&(table.clone(), column.clone())) {
            None => changes.push((table, column, SchemaChange::ColumnRemoved)),
            Some(curr_type) if !curr_type.eq_ignore_ascii_case(base_type) => {
                changes.push((table, column, SchemaChange::TypeChanged))
            }
            Some(_) => {}
        }
    }

    for (table, column) in after.keys() {
        if !before.contains_key(&(table.clone(), column.clone())) {
            changes.push((table, column, SchemaChange::ColumnAdded));
        }
    }

    changes
        .into_iter()
        .map(|(table, column, change)| AnomalyCandidate {
            source: DetectorKind::SchemaDrift,
            dimension: Dimension::Schema,
            key: MetricKey::new(table.as_str(), column.as_str(), change.metric_name()),
            signal: Signal::Categorical {
                severity: change.severity(),
                change,
            },
        })
        .collect()
}
