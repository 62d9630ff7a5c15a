// dqscore-core/src/infrastructure/adapters/sinks.rs

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, warn};

use crate::domain::alert::{AlertEvent, AlertLevel};
use crate::error::DqError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::alert_sink::AlertSink;

/// Writes the alert through `tracing`: CRITICAL at ERROR, WARNING at WARN.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn notify(&self, event: &AlertEvent) -> Result<(), DqError> {
        let issue = event.issue.map(|d| d.as_str()).unwrap_or("unknown");
        match event.level {
            AlertLevel::Critical => error!(
                dataset = %event.dataset_name,
                run_date = %event.run_date,
                score = event.dq_score,
                issue,
                summary = %event.summary,
                "🚨 ALERT TRIGGERED ({})",
                event.level
            ),
            AlertLevel::Warning => warn!(
                dataset = %event.dataset_name,
                run_date = %event.run_date,
                score = event.dq_score,
                issue,
                summary = %event.summary,
                "⚠️  ALERT TRIGGERED ({})",
                event.level
            ),
        }
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}

/// Appends one JSON object per alert to a file.
pub struct JsonLinesAlertSink {
    path: PathBuf,
    // Serializes appends from concurrent dataset runs
    lock: Mutex<()>,
}

impl JsonLinesAlertSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AlertSink for JsonLinesAlertSink {
    async fn notify(&self, event: &AlertEvent) -> Result<(), DqError> {
        let mut line = serde_json::to_string(event).map_err(InfrastructureError::JsonError)?;
        line.push('\n');

        let _guard = self.lock.lock().map_err(|_| {
            DqError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "Alert log Mutex Poisoned",
            )))
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "jsonl"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dimension::Dimension;
    use anyhow::Result;
    use chrono::NaiveDate;

    fn event(level: AlertLevel) -> AlertEvent {
        AlertEvent {
            dataset_id: 1,
            dataset_name: "orders".into(),
            run_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            level,
            dq_score: 65,
            issue: Some(Dimension::Volume),
            summary: "summary not available".into(),
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("alerts.jsonl");
        let sink = JsonLinesAlertSink::new(&path);

        sink.notify(&event(AlertLevel::Critical)).await?;
        sink.notify(&event(AlertLevel::Warning)).await?;

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "CRITICAL");
        assert_eq!(lines[0]["issue"], "volume");
        assert_eq!(lines[1]["run_date"], "2024-03-31");
        Ok(())
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() -> Result<()> {
        TracingAlertSink.notify(&event(AlertLevel::Critical)).await?;
        assert_eq!(TracingAlertSink.sink_name(), "log");
        Ok(())
    }
}
