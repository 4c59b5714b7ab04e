//! Telemetry publishing abstraction
//!
//! Trait-based interface for forwarding robot snapshots and exchange events
//! to any sink (console, a message bus, a log file).

use async_trait::async_trait;

use crate::json_output::ExchangeEvent;
use crate::monitor::TelemetrySnapshot;

/// Trait for publishing robot telemetry data
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    /// Publish the latest telemetry snapshot
    async fn publish_snapshot(&self, snapshot: &TelemetrySnapshot) -> anyhow::Result<()>;

    /// Publish one command exchange
    async fn publish_exchange(&self, event: &ExchangeEvent) -> anyhow::Result<()>;

    /// Optional: publish custom telemetry data
    async fn publish_custom(&self, topic: &str, data: &serde_json::Value) -> anyhow::Result<()> {
        let _ = (topic, data);
        Ok(())
    }
}

/// Publisher that discards everything
#[derive(Debug, Clone)]
pub struct NoOpTelemetry;

#[async_trait]
impl TelemetryPublisher for NoOpTelemetry {
    async fn publish_snapshot(&self, _snapshot: &TelemetrySnapshot) -> anyhow::Result<()> {
        Ok(())
    }

    async fn publish_exchange(&self, _event: &ExchangeEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Prints all telemetry to stdout, one JSON document per record
#[derive(Debug, Clone)]
pub struct ConsoleTelemetry {
    pub pretty_print: bool,
}

impl ConsoleTelemetry {
    pub fn new() -> Self {
        Self { pretty_print: false }
    }

    pub fn pretty() -> Self {
        Self { pretty_print: true }
    }

    fn render<T: serde::Serialize>(&self, data: &T) -> anyhow::Result<String> {
        Ok(if self.pretty_print {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        })
    }
}

impl Default for ConsoleTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryPublisher for ConsoleTelemetry {
    async fn publish_snapshot(&self, snapshot: &TelemetrySnapshot) -> anyhow::Result<()> {
        println!("{}", self.render(snapshot)?);
        Ok(())
    }

    async fn publish_exchange(&self, event: &ExchangeEvent) -> anyhow::Result<()> {
        println!("{}", self.render(event)?);
        Ok(())
    }

    async fn publish_custom(&self, topic: &str, data: &serde_json::Value) -> anyhow::Result<()> {
        tracing::debug!("Console output for {}", topic);
        println!("{}", self.render(data)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ExchangeOutcome;
    use crate::protocol::Command;

    #[tokio::test]
    async fn test_publishers_accept_all_data() {
        let snapshot = TelemetrySnapshot::default();
        let event = ExchangeEvent::new(&Command::home(), &ExchangeOutcome::NoAnswer);
        let publishers: Vec<Box<dyn TelemetryPublisher>> =
            vec![Box::new(NoOpTelemetry), Box::new(ConsoleTelemetry::pretty())];

        for publisher in &publishers {
            publisher.publish_snapshot(&snapshot).await.unwrap();
            publisher.publish_exchange(&event).await.unwrap();
            publisher.publish_custom("status", &serde_json::json!({"ok": true})).await.unwrap();
        }
    }

    #[test]
    fn test_console_render_modes() {
        let compact = ConsoleTelemetry::new().render(&serde_json::json!({"a": 1})).unwrap();
        let pretty = ConsoleTelemetry::pretty().render(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(compact, "{\"a\":1}");
        assert!(pretty.contains('\n'));
    }
}
