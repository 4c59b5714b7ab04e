//! Command channel for the Mecademic control port
//!
//! Sends one command at a time and waits for a reply frame whose code is one
//! of the command's success codes or one of the robot's error codes. Replies
//! are matched by code only; the protocol carries no sequence numbers.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::codes::{ANOTHER_USER_CONNECTED, CONNECTION_ACCEPTED};
use crate::protocol::{expected_codes, Command, ExpectedCodes, Frame, FrameReassembler, SessionFlags, Value};
use crate::recovery::{ReconnectOnce, RecoveryAction, RecoveryPolicy, TransportFailure};
use crate::{MecaError, Result};

const READ_BUFFER_SIZE: usize = 1024;

/// A decoded reply frame
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: u32,
    pub value: Value,
    pub frame: Frame,
}

impl Response {
    fn from_frame(frame: Frame) -> Self {
        Self {
            code: frame.code,
            value: frame.decode(),
            frame,
        }
    }
}

/// Why an exchange was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The channel's error flag is set; call `reset_error` first
    InError,
    NotConnected,
}

/// Result of one command/response cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// A success code for the command was received
    Completed(Response),
    /// An error code was received; the channel is now in error
    Rejected(Response),
    /// Neither a success nor an error code arrived before the deadline
    NoAnswer,
    /// Nothing was sent
    Skipped(SkipReason),
    /// The socket failed; the recovery policy has already been applied
    TransportFailed {
        failure: TransportFailure,
        reconnected: bool,
    },
}

impl ExchangeOutcome {
    /// Decoded payload of a completed or rejected exchange
    pub fn value(&self) -> Option<&Value> {
        self.response().map(|response| &response.value)
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            ExchangeOutcome::Completed(response) | ExchangeOutcome::Rejected(response) => Some(response.value),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            ExchangeOutcome::Completed(response) | ExchangeOutcome::Rejected(response) => Some(response),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ExchangeOutcome::Rejected(_))
    }
}

/// Which kind of code a reply frame matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Success,
    Error,
}

/// Pick the reply frame among the frames completed by one read
///
/// Success codes win over error codes; within a kind the first frame wins.
pub fn match_reply<'a>(frames: &'a [Frame], expected: &ExpectedCodes) -> Option<(ReplyKind, &'a Frame)> {
    frames
        .iter()
        .find(|frame| expected.is_success(frame.code))
        .map(|frame| (ReplyKind::Success, frame))
        .or_else(|| {
            frames
                .iter()
                .find(|frame| expected.is_error(frame.code))
                .map(|frame| (ReplyKind::Error, frame))
        })
}

/// Synchronous command/response channel on the control port
pub struct CommandChannel {
    address: String,
    socket: Option<TcpStream>,
    reassembler: FrameReassembler,
    error: bool,
    flags: SessionFlags,
    welcome: Option<String>,
    connect_timeout: Duration,
    handshake_timeout: Duration,
    default_timeout: Duration,
    recovery: Box<dyn RecoveryPolicy>,
}

impl CommandChannel {
    /// Create an unconnected channel with protocol default timeouts
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            socket: None,
            reassembler: FrameReassembler::new(),
            error: false,
            flags: SessionFlags::default(),
            welcome: None,
            connect_timeout: Duration::from_millis(100),
            handshake_timeout: Duration::from_secs(10),
            default_timeout: Duration::from_secs(20),
            recovery: Box::new(ReconnectOnce::default()),
        }
    }

    /// Create an unconnected channel from configuration
    pub fn from_config(config: &Config) -> Self {
        let connection = &config.connection;
        Self::new(config.control_address())
            .with_timeouts(
                connection.connect_timeout(),
                connection.handshake_timeout(),
                connection.exchange_timeout(),
            )
            .with_recovery(Box::new(ReconnectOnce::new(connection.reconnect_pause())))
    }

    pub fn with_timeouts(mut self, connect: Duration, handshake: Duration, exchange: Duration) -> Self {
        self.connect_timeout = connect;
        self.handshake_timeout = handshake;
        self.default_timeout = exchange;
        self
    }

    pub fn with_recovery(mut self, recovery: Box<dyn RecoveryPolicy>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Connect and validate the welcome frame
    ///
    /// Returns false on connect timeout, handshake timeout, or a welcome frame
    /// other than "connection accepted". Failures are logged, never raised.
    pub async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(welcome) => {
                info!("Connected to control port {}: {}", self.address, welcome.payload);
                self.welcome = Some(welcome.payload);
                true
            }
            Err(e) => {
                warn!("Control connection to {} failed: {}", self.address, e);
                false
            }
        }
    }

    async fn try_connect(&mut self) -> Result<Frame> {
        self.disconnect();

        let mut socket = timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| MecaError::Connection(format!("Connect timeout after {:?}", self.connect_timeout)))?
            .map_err(|e| MecaError::Connection(format!("Failed to connect to {}: {}", self.address, e)))?;
        socket.set_nodelay(true)?;

        let deadline = Instant::now() + self.handshake_timeout;
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let n = timeout(remaining, socket.read(&mut buffer))
                .await
                .map_err(|_| MecaError::Connection("No welcome frame received from robot".to_string()))??;
            if n == 0 {
                return Err(MecaError::Connection("Robot closed the connection during handshake".to_string()));
            }

            if let Some(frame) = self.reassembler.push_frames(&buffer[..n]).into_iter().next() {
                match frame.code {
                    CONNECTION_ACCEPTED => {}
                    ANOTHER_USER_CONNECTED => {
                        self.reassembler.clear();
                        return Err(MecaError::Connection(format!(
                            "Robot is busy with another client: {}",
                            frame.payload
                        )));
                    }
                    code => {
                        self.reassembler.clear();
                        return Err(MecaError::Connection(format!(
                            "Connection refused [{}]: {}",
                            code, frame.payload
                        )));
                    }
                }

                self.socket = Some(socket);
                // A fresh session starts with the firmware's notification defaults
                self.flags = SessionFlags::default();
                return Ok(frame);
            }
        }
    }

    /// Close the socket and drop any partially received frame
    pub fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!("Disconnected from control port {}", self.address);
        }
        self.reassembler.clear();
    }

    /// Send a command and wait up to `limit` for its reply
    pub async fn exchange(&mut self, command: &Command, limit: Duration) -> ExchangeOutcome {
        let expected = expected_codes(command.name(), self.flags);

        if self.error {
            debug!("Skipping {}: robot is in error", command);
            return ExchangeOutcome::Skipped(SkipReason::InError);
        }
        let Some(socket) = self.socket.as_mut() else {
            debug!("Skipping {}: not connected", command);
            return ExchangeOutcome::Skipped(SkipReason::NotConnected);
        };

        debug!("Sending {} (expecting {:?})", command, expected.success);
        let written = socket.write_all(&command.to_wire()).await;
        if let Err(e) = written {
            return self.recover(TransportFailure::Send(e.to_string())).await;
        }

        match self.await_reply(&expected, limit).await {
            Ok(Some((ReplyKind::Success, frame))) => {
                debug!("{} completed with [{}]", command, frame.code);
                ExchangeOutcome::Completed(Response::from_frame(frame))
            }
            Ok(Some((ReplyKind::Error, frame))) => {
                warn!("{} rejected with [{}]: {}", command, frame.code, frame.payload);
                self.error = true;
                ExchangeOutcome::Rejected(Response::from_frame(frame))
            }
            Ok(None) => {
                debug!("No answer to {} within {:?}", command, limit);
                ExchangeOutcome::NoAnswer
            }
            Err(failure) => self.recover(failure).await,
        }
    }

    /// Exchange with the configured default timeout
    pub async fn exchange_default(&mut self, command: &Command) -> ExchangeOutcome {
        let limit = self.default_timeout;
        self.exchange(command, limit).await
    }

    async fn await_reply(
        &mut self,
        expected: &ExpectedCodes,
        limit: Duration,
    ) -> std::result::Result<Option<(ReplyKind, Frame)>, TransportFailure> {
        let deadline = Instant::now() + limit;
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            let socket = self
                .socket
                .as_mut()
                .ok_or_else(|| TransportFailure::Receive("socket closed".to_string()))?;
            let remaining = deadline.saturating_duration_since(Instant::now());

            let n = match timeout(remaining, socket.read(&mut buffer)).await {
                Err(_) => return Ok(None),
                Ok(Err(e)) => return Err(TransportFailure::Receive(e.to_string())),
                Ok(Ok(0)) => return Err(TransportFailure::Receive("connection closed by robot".to_string())),
                Ok(Ok(n)) => n,
            };

            let frames = self.reassembler.push_frames(&buffer[..n]);
            if let Some((kind, frame)) = match_reply(&frames, expected) {
                return Ok(Some((kind, frame.clone())));
            }
        }
    }

    async fn recover(&mut self, failure: TransportFailure) -> ExchangeOutcome {
        warn!("Exchange on {} failed: {}", self.address, failure);
        let action = self.recovery.on_transport_failure(&failure);
        self.disconnect();

        let reconnected = match action {
            RecoveryAction::Disconnect => false,
            RecoveryAction::Reconnect { pause } => {
                sleep(pause).await;
                info!("Reconnecting to {}", self.address);
                self.connect().await
            }
        };

        ExchangeOutcome::TransportFailed { failure, reconnected }
    }

    /// Clear the error flag and ask the robot to reset its error
    ///
    /// The flag is cleared on confirmation and set on an error reply; any
    /// other outcome leaves it as it was.
    pub async fn reset_error(&mut self) -> ExchangeOutcome {
        let previous = self.error;
        self.error = false;
        let outcome = self.exchange_default(&Command::new("ResetError")).await;
        self.error = match &outcome {
            ExchangeOutcome::Completed(_) => false,
            ExchangeOutcome::Rejected(_) => true,
            _ => previous,
        };
        outcome
    }

    /// Enable or disable end-of-block notifications
    pub async fn set_end_of_block(&mut self, enabled: bool) -> ExchangeOutcome {
        self.flags.end_of_block = enabled;
        self.exchange_default(&Command::with_args("SetEOB", [u8::from(enabled)])).await
    }

    /// Enable or disable end-of-movement notifications
    pub async fn set_end_of_movement(&mut self, enabled: bool) -> ExchangeOutcome {
        self.flags.end_of_movement = enabled;
        self.exchange_default(&Command::with_args("SetEOM", [u8::from(enabled)])).await
    }

    pub fn is_in_error(&self) -> bool {
        self.error
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn session_flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Payload of the last welcome frame
    pub fn welcome(&self) -> Option<&str> {
        self.welcome.as_deref()
    }
}
