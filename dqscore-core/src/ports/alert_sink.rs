// dqscore-core/src/ports/alert_sink.rs

use async_trait::async_trait;

use crate::domain::alert::AlertEvent;
use crate::error::DqError;

/// Destination for triggered alerts (log, file, chat webhook...).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, event: &AlertEvent) -> Result<(), DqError>;

    fn sink_name(&self) -> &str;
}
