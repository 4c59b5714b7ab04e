//! mecad - host-side driver for Mecademic robot arms
//!
//! Talks to the robot's two TCP ports: the control port, where commands are
//! sent one at a time and matched to reply codes, and the monitoring port,
//! which streams joint, pose and status telemetry.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mecad::{Config, RobotController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut robot = RobotController::new(Config::for_host("192.168.0.100"));
//!     robot.connect().await?;
//!
//!     robot.activate().await;
//!     robot.home().await;
//!     if let Some(joints) = robot.get_joints().await {
//!         println!("Joints: {:?}", joints);
//!     }
//!
//!     robot.start_telemetry().await?;
//!     println!("Telemetry: {:?}", robot.telemetry());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **CommandChannel**: control socket, reply matching, error flag and recovery
//! - **TelemetryChannel**: monitoring socket and latest-value snapshot
//! - **protocol**: frame reassembly, response codes, payload decoding
//! - **RobotController**: both channels behind one command per method
//! - **FirmwareUpdater**: HTTP firmware upload and progress tracking

pub mod channel;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod firmware;
pub mod json_output;
pub mod monitor;
pub mod monitoring;
pub mod protocol;
pub mod recovery;
pub mod telemetry;

pub use channel::{CommandChannel, ExchangeOutcome, Response, SkipReason};
pub use commands::{GripperStatus, RobotStatus, Vector6};
pub use config::{Config, ConnectionConfig, FirmwareConfig, MonitoringConfig, RobotConfig};
pub use controller::{ControllerState, RobotController};
pub use error::{MecaError, Result};
pub use firmware::{FirmwareUpdater, UpdateStatus};
pub use json_output::{ExchangeEvent, ExchangeStatus};
pub use monitor::{TelemetryChannel, TelemetrySnapshot, TelemetrySubscriber};
pub use monitoring::{MonitorOutput, PositionData, StatusData};
pub use protocol::{Command, Frame, FrameReassembler, SessionFlags, TelemetryCodeTable, Value};
pub use recovery::{DisconnectOnly, ReconnectOnce, RecoveryAction, RecoveryPolicy, TransportFailure};
pub use telemetry::{ConsoleTelemetry, NoOpTelemetry, TelemetryPublisher};
