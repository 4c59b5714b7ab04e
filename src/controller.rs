//! Robot controller for Mecademic arms
//!
//! Owns the control channel and, once started, the telemetry subscriber.
//! Every robot command is a thin call into [`CommandChannel::exchange`].

use crate::{
    channel::{CommandChannel, ExchangeOutcome},
    commands::{GripperStatus, RobotStatus, Vector6},
    config::Config,
    json_output::ExchangeEvent,
    monitor::{TelemetryChannel, TelemetrySnapshot, TelemetrySubscriber},
    protocol::{parse_firmware_version, Command, Value},
    telemetry::{NoOpTelemetry, TelemetryPublisher},
};
use anyhow::{anyhow, Context, Result};
use semver::Version;
use std::time::Duration;
use tracing::{info, warn};

/// Controller connection states
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Disconnected,
    Connected,
    Error(String),
}

/// High-level robot interface combining both ports
pub struct RobotController {
    config: Config,
    channel: CommandChannel,
    telemetry: Option<TelemetrySubscriber>,
    firmware_version: Option<Version>,
    state: ControllerState,
    publisher: Box<dyn TelemetryPublisher>,
}

impl RobotController {
    pub fn new(config: Config) -> Self {
        let channel = CommandChannel::from_config(&config);
        Self {
            config,
            channel,
            telemetry: None,
            firmware_version: None,
            state: ControllerState::Disconnected,
            publisher: Box::new(NoOpTelemetry),
        }
    }

    /// Publish every exchange through `publisher`
    pub fn with_publisher(mut self, publisher: Box<dyn TelemetryPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Create a controller from a configuration file
    pub fn new_with_config(config_path: &str) -> Result<Self> {
        let config = Config::load_from_path(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?;
        Ok(Self::new(config))
    }

    /// Connect the control port
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to robot at {}", self.config.robot.host);

        if !self.channel.connect().await {
            self.state = ControllerState::Error("Control connection failed".to_string());
            return Err(anyhow!("Failed to connect to control port {}", self.channel.address()));
        }

        self.state = ControllerState::Connected;
        Ok(())
    }

    /// Resolve the firmware version: welcome text, then query, then config
    pub async fn firmware_version(&mut self) -> Result<Version> {
        if let Some(version) = &self.firmware_version {
            return Ok(version.clone());
        }

        let from_welcome = self
            .channel
            .welcome()
            .and_then(|welcome| parse_firmware_version(welcome).ok());

        let version = match from_welcome {
            Some(version) => version,
            None => match self.exchange(Command::get_fw_version()).await {
                ExchangeOutcome::Completed(response) => {
                    parse_firmware_version(response.value.as_text().unwrap_or_default())
                        .context("Failed to parse GetFwVersion reply")?
                }
                ExchangeOutcome::Rejected(response) => {
                    warn!("GetFwVersion rejected [{}], clearing error", response.code);
                    self.channel.reset_error().await;
                    self.configured_version()?
                }
                _ => self.configured_version()?,
            },
        };

        info!("Robot firmware version {}", version);
        self.firmware_version = Some(version.clone());
        Ok(version)
    }

    fn configured_version(&self) -> Result<Version> {
        let configured = self
            .config
            .monitoring
            .firmware_version
            .as_deref()
            .ok_or_else(|| anyhow!("Robot did not report its firmware version"))?;
        parse_firmware_version(configured).context("Failed to parse configured firmware version")
    }

    /// Connect the monitoring port and stream telemetry in the background
    pub async fn start_telemetry(&mut self) -> Result<()> {
        let version = self.firmware_version().await?;
        let mut channel = TelemetryChannel::from_config(&self.config, version);

        if !channel.connect().await {
            return Err(anyhow!("Failed to connect to monitoring port {}", self.config.monitoring_address()));
        }

        self.telemetry = Some(channel.into_subscriber());
        Ok(())
    }

    /// Latest telemetry, if streaming has been started
    pub fn telemetry(&self) -> Option<TelemetrySnapshot> {
        self.telemetry.as_ref().map(TelemetrySubscriber::latest)
    }

    pub fn telemetry_mut(&mut self) -> Option<&mut TelemetrySubscriber> {
        self.telemetry.as_mut()
    }

    /// Send a command with the default timeout
    pub async fn exchange(&mut self, command: Command) -> ExchangeOutcome {
        let limit = self.channel.default_timeout();
        self.exchange_with_timeout(command, limit).await
    }

    /// Send a command, wait up to `limit` and publish the outcome
    pub async fn exchange_with_timeout(&mut self, command: Command, limit: Duration) -> ExchangeOutcome {
        let outcome = self.channel.exchange(&command, limit).await;

        let event = ExchangeEvent::new(&command, &outcome);
        if let Err(e) = self.publisher.publish_exchange(&event).await {
            warn!("Failed to publish exchange for {}: {}", command, e);
        }
        outcome
    }


    async fn exchange_value(&mut self, command: Command) -> Option<Value> {
        self.exchange(command).await.into_value()
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut CommandChannel {
        &mut self.channel
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_in_error(&self) -> bool {
        self.channel.is_in_error()
    }

    pub async fn reset_error(&mut self) -> ExchangeOutcome {
        self.channel.reset_error().await
    }

    pub async fn set_eob(&mut self, enabled: bool) -> ExchangeOutcome {
        self.channel.set_end_of_block(enabled).await
    }

    pub async fn set_eom(&mut self, enabled: bool) -> ExchangeOutcome {
        self.channel.set_end_of_movement(enabled).await
    }

    pub async fn activate(&mut self) -> ExchangeOutcome {
        self.exchange(Command::activate_robot()).await
    }

    pub async fn deactivate(&mut self) -> ExchangeOutcome {
        self.exchange(Command::deactivate_robot()).await
    }

    pub async fn activate_sim(&mut self) -> ExchangeOutcome {
        self.exchange(Command::activate_sim()).await
    }

    pub async fn deactivate_sim(&mut self) -> ExchangeOutcome {
        self.exchange(Command::deactivate_sim()).await
    }

    pub async fn switch_to_ethercat(&mut self) -> ExchangeOutcome {
        self.exchange(Command::switch_to_ethercat()).await
    }

    pub async fn home(&mut self) -> ExchangeOutcome {
        self.exchange(Command::home()).await
    }

    pub async fn brakes_on(&mut self) -> ExchangeOutcome {
        self.exchange(Command::brakes_on()).await
    }

    pub async fn brakes_off(&mut self) -> ExchangeOutcome {
        self.exchange(Command::brakes_off()).await
    }

    pub async fn gripper_open(&mut self) -> ExchangeOutcome {
        self.exchange(Command::gripper_open()).await
    }

    pub async fn gripper_close(&mut self) -> ExchangeOutcome {
        self.exchange(Command::gripper_close()).await
    }

    pub async fn pause_motion(&mut self) -> ExchangeOutcome {
        self.exchange(Command::pause_motion()).await
    }

    pub async fn resume_motion(&mut self) -> ExchangeOutcome {
        self.exchange(Command::resume_motion()).await
    }

    pub async fn clear_motion(&mut self) -> ExchangeOutcome {
        self.exchange(Command::clear_motion()).await
    }

    /// Robot-side delay; the reply is awaited for twice the delay
    pub async fn delay(&mut self, seconds: f64) -> ExchangeOutcome {
        let limit = Duration::try_from_secs_f64(seconds * 2.0).unwrap_or(self.channel.default_timeout());
        self.exchange_with_timeout(Command::delay(seconds), limit).await
    }

    pub async fn move_joints(&mut self, joints: Vector6) -> ExchangeOutcome {
        self.exchange(Command::move_joints(joints)).await
    }

    pub async fn move_lin(&mut self, pose: Vector6) -> ExchangeOutcome {
        self.exchange(Command::move_lin(pose)).await
    }

    pub async fn move_lin_rel_trf(&mut self, offset: Vector6) -> ExchangeOutcome {
        self.exchange(Command::move_lin_rel_trf(offset)).await
    }

    pub async fn move_lin_rel_wrf(&mut self, offset: Vector6) -> ExchangeOutcome {
        self.exchange(Command::move_lin_rel_wrf(offset)).await
    }

    pub async fn move_pose(&mut self, pose: Vector6) -> ExchangeOutcome {
        self.exchange(Command::move_pose(pose)).await
    }

    pub async fn set_blending(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_blending(percentage)).await
    }

    pub async fn set_auto_conf(&mut self, enabled: bool) -> ExchangeOutcome {
        self.exchange(Command::set_auto_conf(enabled)).await
    }

    pub async fn set_cart_acc(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_cart_acc(percentage)).await
    }

    pub async fn set_cart_ang_vel(&mut self, degrees_per_second: f64) -> ExchangeOutcome {
        self.exchange(Command::set_cart_ang_vel(degrees_per_second)).await
    }

    pub async fn set_cart_lin_vel(&mut self, mm_per_second: f64) -> ExchangeOutcome {
        self.exchange(Command::set_cart_lin_vel(mm_per_second)).await
    }

    pub async fn set_conf(&mut self, c1: i8, c3: i8, c5: i8) -> ExchangeOutcome {
        self.exchange(Command::set_conf(c1, c3, c5)).await
    }

    pub async fn set_gripper_force(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_gripper_force(percentage)).await
    }

    pub async fn set_gripper_vel(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_gripper_vel(percentage)).await
    }

    pub async fn set_joint_acc(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_joint_acc(percentage)).await
    }

    pub async fn set_joint_vel(&mut self, percentage: f64) -> ExchangeOutcome {
        self.exchange(Command::set_joint_vel(percentage)).await
    }

    pub async fn set_trf(&mut self, frame: Vector6) -> ExchangeOutcome {
        self.exchange(Command::set_trf(frame)).await
    }

    pub async fn set_wrf(&mut self, frame: Vector6) -> ExchangeOutcome {
        self.exchange(Command::set_wrf(frame)).await
    }

    pub async fn get_joints(&mut self) -> Option<Value> {
        self.exchange_value(Command::get_joints()).await
    }

    pub async fn get_pose(&mut self) -> Option<Value> {
        self.exchange_value(Command::get_pose()).await
    }

    pub async fn get_conf(&mut self) -> Option<Value> {
        self.exchange_value(Command::get_conf()).await
    }

    /// Query robot status, retrying until the robot answers
    pub async fn get_status_robot(&mut self) -> Result<RobotStatus> {
        let value = self.query_until_answered(Command::get_status_robot).await?;
        RobotStatus::from_value(&value).ok_or_else(|| anyhow!("Unexpected robot status reply: {:?}", value))
    }

    /// Query gripper status, retrying until the robot answers
    pub async fn get_status_gripper(&mut self) -> Result<GripperStatus> {
        let value = self.query_until_answered(Command::get_status_gripper).await?;
        GripperStatus::from_value(&value).ok_or_else(|| anyhow!("Unexpected gripper status reply: {:?}", value))
    }

    async fn query_until_answered(&mut self, command: fn() -> Command) -> Result<Value> {
        let attempts = self.config.connection.status_query_attempts();

        for attempt in 1..=attempts {
            match self.exchange(command()).await {
                ExchangeOutcome::Completed(response) => return Ok(response.value),
                ExchangeOutcome::Rejected(response) => {
                    return Err(anyhow!("{} rejected [{}]: {:?}", command(), response.code, response.value));
                }
                ExchangeOutcome::Skipped(reason) => {
                    return Err(anyhow!("{} not sent: {:?}", command(), reason));
                }
                other => warn!("{} attempt {}/{} produced no answer: {:?}", command(), attempt, attempts, other),
            }
        }

        Err(anyhow!("{} unanswered after {} attempts", command(), attempts))
    }

    /// Close both connections
    pub fn disconnect(&mut self) {
        self.telemetry = None;
        self.channel.disconnect();
        self.state = ControllerState::Disconnected;
        info!("Robot controller disconnected");
    }
}
