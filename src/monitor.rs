//! Telemetry channel for the Mecademic monitoring port
//!
//! The robot streams bracketed frames continuously once connected. Each poll
//! performs one bounded read, reassembles complete frames and overwrites the
//! snapshot field mapped to each frame's code. No history is kept.

use std::time::Duration;

use semver::Version;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::{Frame, FrameReassembler, TelemetryCodeTable, TelemetryField, Value};
use crate::{MecaError, Result};

const READ_BUFFER_SIZE: usize = 256;

/// Latest telemetry values, each empty until first received
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Joint angles in degrees
    pub joints: Vec<f64>,
    /// Flange pose [x, y, z, alpha, beta, gamma] in mm and degrees
    pub cartesian: Vec<f64>,
    pub joint_velocity: Vec<f64>,
    pub torque_ratio: Vec<f64>,
    pub accelerometer: Vec<f64>,
    pub robot_status: Vec<i64>,
    pub gripper_status: Vec<i64>,
}

impl TelemetrySnapshot {
    /// Overwrite the field for one decoded frame
    ///
    /// Returns false when the value kind does not fit the field.
    pub fn apply(&mut self, field: TelemetryField, value: Value) -> bool {
        match (field, value) {
            (TelemetryField::Joints, Value::Floats(v)) => self.joints = v,
            (TelemetryField::Cartesian, Value::Floats(v)) => self.cartesian = v,
            (TelemetryField::JointVelocity, Value::Floats(v)) => self.joint_velocity = v,
            (TelemetryField::TorqueRatio, Value::Floats(v)) => self.torque_ratio = v,
            (TelemetryField::Accelerometer, Value::Floats(v)) => self.accelerometer = v,
            (TelemetryField::RobotStatus, Value::Ints(v)) => self.robot_status = v,
            (TelemetryField::GripperStatus, Value::Ints(v)) => self.gripper_status = v,
            _ => return false,
        }
        true
    }
}

/// Streaming telemetry reader on the monitoring port
pub struct TelemetryChannel {
    address: String,
    socket: Option<TcpStream>,
    reassembler: FrameReassembler,
    version: Version,
    table: TelemetryCodeTable,
    snapshot: TelemetrySnapshot,
    connect_timeout: Duration,
    handshake_timeout: Duration,
    poll_timeout: Duration,
}

impl TelemetryChannel {
    /// Create an unconnected channel for a robot running `version`
    pub fn new(address: impl Into<String>, version: Version) -> Self {
        let table = TelemetryCodeTable::for_version(&version);
        Self {
            address: address.into(),
            socket: None,
            reassembler: FrameReassembler::new(),
            version,
            table,
            snapshot: TelemetrySnapshot::default(),
            connect_timeout: Duration::from_millis(100),
            handshake_timeout: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(100),
        }
    }

    pub fn from_config(config: &Config, version: Version) -> Self {
        Self::new(config.monitoring_address(), version).with_timeouts(
            config.connection.connect_timeout(),
            config.monitoring.handshake_timeout(),
            config.monitoring.poll_timeout(),
        )
    }

    pub fn with_timeouts(mut self, connect: Duration, handshake: Duration, poll: Duration) -> Self {
        self.connect_timeout = connect;
        self.handshake_timeout = handshake;
        self.poll_timeout = poll;
        self
    }

    /// Connect and take the first read
    ///
    /// On streaming firmware the first frame after connecting carries the
    /// robot and gripper status snapshots.
    pub async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(applied) => {
                if self.table.sends_initial_status() && self.snapshot.robot_status.is_empty() {
                    warn!("No initial status frame from {}", self.address);
                }
                info!(
                    "Connected to monitoring port {} ({:?} table, {} initial frames)",
                    self.address, self.table, applied
                );
                true
            }
            Err(e) => {
                warn!("Monitoring connection to {} failed: {}", self.address, e);
                false
            }
        }
    }

    async fn try_connect(&mut self) -> Result<usize> {
        self.disconnect();

        let socket = timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| MecaError::Connection(format!("Connect timeout after {:?}", self.connect_timeout)))?
            .map_err(|e| MecaError::Connection(format!("Failed to connect to {}: {}", self.address, e)))?;
        self.socket = Some(socket);

        let handshake = self.handshake_timeout;
        self.poll(handshake).await
    }

    pub fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!("Disconnected from monitoring port {}", self.address);
        }
        self.reassembler.clear();
    }

    /// Perform at most one read and apply every completed frame
    ///
    /// Returns the number of frames that updated the snapshot. A read that
    /// times out yields `Ok(0)`; a closed socket is an error.
    pub async fn poll(&mut self, limit: Duration) -> Result<usize> {
        let Some(socket) = self.socket.as_mut() else {
            return Ok(0);
        };

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let n = match timeout(limit, socket.read(&mut buffer)).await {
            Err(_) => return Ok(0),
            Ok(Err(e)) => {
                self.disconnect();
                return Err(MecaError::Io(e));
            }
            Ok(Ok(0)) => {
                self.disconnect();
                return Err(MecaError::Connection("Monitoring stream closed by robot".to_string()));
            }
            Ok(Ok(n)) => n,
        };

        let frames = self.reassembler.push_frames(&buffer[..n]);
        Ok(frames.iter().filter(|frame| self.dispatch(frame)).count())
    }

    /// Poll with the configured timeout
    pub async fn poll_default(&mut self) -> Result<usize> {
        let limit = self.poll_timeout;
        self.poll(limit).await
    }

    /// Route one frame into the snapshot; unknown codes are ignored
    pub fn dispatch(&mut self, frame: &Frame) -> bool {
        match self.table.field_for(frame.code) {
            Some(field) => self.snapshot.apply(field, frame.decode()),
            None => false,
        }
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn table(&self) -> TelemetryCodeTable {
        self.table
    }

    /// Move the channel into a background task publishing snapshots
    pub fn into_subscriber(self) -> TelemetrySubscriber {
        TelemetrySubscriber::spawn(self)
    }
}

/// Background poller sharing the latest snapshot through a watch channel
pub struct TelemetrySubscriber {
    pub snapshot_receiver: watch::Receiver<TelemetrySnapshot>,
    task_handle: tokio::task::JoinHandle<()>,
}

impl TelemetrySubscriber {
    fn spawn(mut channel: TelemetryChannel) -> Self {
        let (sender, snapshot_receiver) = watch::channel(channel.snapshot().clone());

        let task_handle = tokio::spawn(async move {
            loop {
                if !channel.is_connected() {
                    debug!("Telemetry channel not connected, stopping subscriber");
                    break;
                }
                match channel.poll_default().await {
                    Ok(0) => {
                        if sender.is_closed() {
                            break;
                        }
                    }
                    Ok(_) => {
                        if sender.send(channel.snapshot().clone()).is_err() {
                            // Receiver dropped, exit task
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Telemetry stream ended: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            snapshot_receiver,
            task_handle,
        }
    }

    /// Latest snapshot (non-blocking)
    pub fn latest(&self) -> TelemetrySnapshot {
        self.snapshot_receiver.borrow().clone()
    }

    /// Wait for the next snapshot update; None once the stream has ended
    pub async fn next(&mut self) -> Option<TelemetrySnapshot> {
        self.snapshot_receiver.changed().await.ok()?;
        Some(self.snapshot_receiver.borrow().clone())
    }
}

impl Drop for TelemetrySubscriber {
    fn drop(&mut self) {
        self.task_handle.abort();
    }
}
