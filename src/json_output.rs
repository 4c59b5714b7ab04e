//! JSON output for command exchanges
//!
//! One JSON record per exchange, handed to a `TelemetryPublisher` and
//! consumable by external tools reading the driver's stdout.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::channel::{ExchangeOutcome, SkipReason};
use crate::protocol::{Command, Value};

/// Current time as f64 seconds since UNIX epoch, millisecond precision
pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Completed,
    Rejected,
    NoAnswer,
    Skipped,
    TransportFailed,
}

/// Exchange event output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub timestamp: f64,
    /// Event type for JSON parsing
    #[serde(rename = "type")]
    pub event_type: String,
    /// Command text as sent
    pub command: String,
    pub status: ExchangeStatus,
    /// Reply code, when a reply frame matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    /// Decoded reply payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExchangeEvent {
    pub fn new(command: &Command, outcome: &ExchangeOutcome) -> Self {
        let (status, message) = match outcome {
            ExchangeOutcome::Completed(_) => (ExchangeStatus::Completed, None),
            ExchangeOutcome::Rejected(_) => (ExchangeStatus::Rejected, Some("Robot is in error".to_string())),
            ExchangeOutcome::NoAnswer => (ExchangeStatus::NoAnswer, Some("No reply before timeout".to_string())),
            ExchangeOutcome::Skipped(SkipReason::InError) => {
                (ExchangeStatus::Skipped, Some("Robot in error, command not sent".to_string()))
            }
            ExchangeOutcome::Skipped(SkipReason::NotConnected) => {
                (ExchangeStatus::Skipped, Some("Not connected".to_string()))
            }
            ExchangeOutcome::TransportFailed { failure, reconnected } => (
                ExchangeStatus::TransportFailed,
                Some(format!("{} (reconnected: {})", failure, reconnected)),
            ),
        };

        let response = outcome.response();
        Self {
            timestamp: current_timestamp(),
            event_type: "exchange".to_string(),
            command: command.to_string(),
            status,
            code: response.map(|r| r.code),
            value: response.map(|r| r.value.clone()),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Response;
    use crate::protocol::Frame;

    fn response(code: u32, payload: &str) -> Response {
        let frame = Frame::new(code, payload);
        Response {
            code,
            value: frame.decode(),
            frame,
        }
    }

    #[test]
    fn test_completed_event_carries_reply() {
        let outcome = ExchangeOutcome::Completed(response(2026, "10,20,30,40,50,60"));
        let event = ExchangeEvent::new(&Command::get_joints(), &outcome);

        assert_eq!(event.status, ExchangeStatus::Completed);
        assert_eq!(event.code, Some(2026));
        assert_eq!(event.value, Some(Value::Floats(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0])));

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "exchange");
        assert_eq!(json["command"], "GetJoints");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["value"][0], 10.0);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_no_answer_event_omits_reply() {
        let event = ExchangeEvent::new(&Command::home(), &ExchangeOutcome::NoAnswer);
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"status\":\"no_answer\""));
        assert!(!json.contains("\"code\""));
        assert!(!json.contains("\"value\""));
    }

    #[test]
    fn test_rejected_event_keeps_error_text() {
        let outcome = ExchangeOutcome::Rejected(response(1005, "The robot is not activated."));
        let event = ExchangeEvent::new(&Command::home(), &outcome);

        assert_eq!(event.status, ExchangeStatus::Rejected);
        assert_eq!(event.code, Some(1005));
        assert_eq!(event.value, Some(Value::Text("The robot is not activated.".to_string())));
    }

    #[test]
    fn test_timestamp_is_recent() {
        assert!(current_timestamp() > 1_600_000_000.0);
    }
}
