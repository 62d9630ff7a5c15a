// dqscore-core/src/domain/detection/explanation.rs

use crate::domain::dimension::Dimension;

/// One-sentence, human-readable reason stored next to each anomaly.
pub fn explain(
    dimension: Dimension,
    table: &str,
    column: &str,
    observed: Option<f64>,
    expected: Option<f64>,
) -> String {
    let fmt_value = |v: Option<f64>| match v {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    };

    match dimension {
        Dimension::Completeness => format!(
            "{}.{} has higher missing values than expected (observed={}, expected≈{}).",
            table,
            column,
            fmt_value(observed),
            fmt_value(expected)
        ),
        Dimension::Volume => format!(
            "Row count for {} deviated from baseline (observed={}, expected≈{}).",
            table,
            fmt_value(observed),
            fmt_value(expected)
        ),
        Dimension::Distribution => format!(
            "Statistical distribution of {}.{} shifted from historical pattern.",
            table, column
        ),
        Dimension::Schema => format!("Schema change detected for {}.{}.", table, column),
        Dimension::Referential => format!(
            "Foreign key integrity issues detected in {}.{}.",
            table, column
        ),
        Dimension::Freshness | Dimension::Other => "Data quality anomaly detected.".to_string(),
    }
}
