// dqscore-core/src/domain/aggregation.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::anomaly::{Anomaly, AnomalyStatus};
use crate::domain::dimension::Dimension;
use crate::domain::severity::Severity;

/// One row per (dimension, table) for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedAnomaly {
    pub dimension: Dimension,
    pub table: String,
    pub dominant_severity: Severity,
    pub anomaly_count: i64,
    /// Sorted, deduplicated column names joined with ", ".
    pub affected_columns: String,
    pub penalty_multiplier: i64,
}

pub struct AnomalyAggregator;

impl AnomalyAggregator {
    /// Groups OPEN anomalies by (dimension, table). Output is ordered by
    /// dimension name, then table.
    pub fn aggregate(anomalies: &[Anomaly]) -> Vec<AggregatedAnomaly> {
        let mut groups: BTreeMap<(Dimension, &str), (Severity, i64, BTreeSet<&str>)> =
            BTreeMap::new();

        for anomaly in anomalies.iter().filter(|a| a.status == AnomalyStatus::Open) {
            let entry = groups
                .entry((anomaly.dimension, anomaly.key.table.as_str()))
                .or_insert((anomaly.severity, 0, BTreeSet::new()));
            entry.0 = entry.0.max(anomaly.severity);
            entry.1 += 1;
            entry.2.insert(anomaly.key.column.as_str());
        }

        groups
            .into_iter()
            .map(|((dimension, table), (dominant_severity, count, columns))| {
                AggregatedAnomaly {
                    dimension,
                    table: table.to_string(),
                    dominant_severity,
                    anomaly_count: count,
                    affected_columns: columns.into_iter().collect::<Vec<_>>().join(", "),
                    penalty_multiplier: count,
                }
            })
            .collect()
    }
}
