// dqscore-core/src/domain/baseline_audit.rs
//
// Sanity summary of the baseline window a run would compare against.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::metric::{MetricKey, TABLE_LEVEL_COLUMN};

/// Spread of the headline baseline metrics over one window.
/// A field is `None` when the window holds no sample for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineAudit {
    pub dataset_name: String,
    pub audit_date: NaiveDate,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub samples: usize,
    pub skipped: usize,
    pub avg_null_rate: Option<f64>,
    pub avg_record_count: Option<f64>,
    pub min_mean: Option<f64>,
    pub max_mean: Option<f64>,
    pub min_std_dev: Option<f64>,
    pub max_std_dev: Option<f64>,
}

#[derive(Default)]
struct Spread {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Spread {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn is_record_count(key: &MetricKey) -> bool {
    key.column == TABLE_LEVEL_COLUMN
        && matches!(key.metric_name.to_lowercase().as_str(), "row_count" | "record_count")
}

impl BaselineAudit {
    /// Summarizes the parsed window samples. Returns `None` for an empty window.
    ///
    /// Only `null_rate`, table-level `row_count`/`record_count`, `mean` and
    /// `std_dev`/`std` feed the summary; other metrics still count as samples.
    pub fn summarize(
        dataset_name: &str,
        audit_date: NaiveDate,
        window: (NaiveDate, NaiveDate),
        samples: &HashMap<MetricKey, Vec<f64>>,
        skipped: usize,
    ) -> Option<Self> {
        let total: usize = samples.values().map(Vec::len).sum();
        if total == 0 {
            return None;
        }

        let mut null_rate = Spread::default();
        let mut record_count = Spread::default();
        let mut mean = Spread::default();
        let mut std_dev = Spread::default();

        for (key, values) in samples {
            let target = match key.metric_name.to_lowercase().as_str() {
                "null_rate" => &mut null_rate,
                "mean" => &mut mean,
                "std_dev" | "std" => &mut std_dev,
                _ if is_record_count(key) => &mut record_count,
                _ => continue,
            };
            values.iter().for_each(|v| target.push(*v));
        }

        Some(Self {
            dataset_name: dataset_name.to_string(),
            audit_date,
            window_start: window.0,
            window_end: window.1,
            samples: total,
            skipped,
            avg_null_rate: null_rate.avg(),
            avg_record_count: record_count.avg(),
            min_mean: mean.min,
            max_mean: mean.max,
            min_std_dev: std_dev.min,
            max_std_dev: std_dev.max,
        })
    }
}
