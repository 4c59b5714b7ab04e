//! Recovery strategies applied by the command channel on transport failure

use std::time::Duration;

use thiserror::Error;

/// Why an exchange lost its transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Nothing could be written to the socket
    #[error("send failed: {0}")]
    Send(String),
    /// The socket failed or closed while waiting for the reply
    #[error("receive failed: {0}")]
    Receive(String),
}

/// What the channel does after a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Tear the connection down and leave it closed
    Disconnect,
    /// Tear down, wait, then attempt one reconnect
    Reconnect { pause: Duration },
}

/// Strategy consulted once per failed exchange
pub trait RecoveryPolicy: Send + Sync {
    fn on_transport_failure(&self, failure: &TransportFailure) -> RecoveryAction;
}

/// Disconnect, pause, and reconnect exactly once
#[derive(Debug, Clone)]
pub struct ReconnectOnce {
    pub pause: Duration,
}

impl ReconnectOnce {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }
}

impl Default for ReconnectOnce {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RecoveryPolicy for ReconnectOnce {
    fn on_transport_failure(&self, _failure: &TransportFailure) -> RecoveryAction {
        RecoveryAction::Reconnect { pause: self.pause }
    }
}

/// Drop the connection and let the caller decide
#[derive(Debug, Clone, Default)]
pub struct DisconnectOnly;

impl RecoveryPolicy for DisconnectOnly {
    fn on_transport_failure(&self, _failure: &TransportFailure) -> RecoveryAction {
        RecoveryAction::Disconnect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_once_uses_configured_pause() {
        let policy = ReconnectOnce::new(Duration::from_millis(250));
        let action = policy.on_transport_failure(&TransportFailure::Send("broken pipe".into()));
        assert_eq!(action, RecoveryAction::Reconnect { pause: Duration::from_millis(250) });
    }

    #[test]
    fn test_default_pause_is_one_second() {
        let action = ReconnectOnce::default()
            .on_transport_failure(&TransportFailure::Receive("reset".into()));
        assert_eq!(action, RecoveryAction::Reconnect { pause: Duration::from_secs(1) });
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(TransportFailure::Send("broken pipe".into()).to_string(), "send failed: broken pipe");
        assert_eq!(TransportFailure::Receive("eof".into()).to_string(), "receive failed: eof");
    }

    #[test]
    fn test_disconnect_only() {
        let action = DisconnectOnly.on_transport_failure(&TransportFailure::Receive("eof".into()));
        assert_eq!(action, RecoveryAction::Disconnect);
    }
}
