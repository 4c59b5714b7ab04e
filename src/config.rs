//! Configuration loading for the Mecademic robot

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::{Result, MecaError};

/// Control port used for command/response traffic
pub const MECA_CONTROL_PORT: u16 = 10000;
/// Monitoring port streaming telemetry frames
pub const MECA_MONITORING_PORT: u16 = 10001;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub robot: RobotConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub firmware: FirmwareConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    pub host: String,
    #[serde(default)]
    pub ports: PortConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortConfig {
    pub control: u16,
    pub monitoring: u16,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub connect_timeout_ms: Option<u64>,
    pub handshake_timeout_secs: Option<u64>,
    pub exchange_timeout_secs: Option<u64>,
    pub reconnect_pause_ms: Option<u64>,
    pub status_query_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub poll_timeout_ms: Option<u64>,
    pub handshake_timeout_ms: Option<u64>,
    pub pub_rate_hz: Option<u32>,
    pub decimal_places: Option<u32>,
    /// Firmware version to assume when it cannot be queried, e.g. "8.1.6"
    pub firmware_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FirmwareConfig {
    pub reboot_wait_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            ports: PortConfig::default(),
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            control: MECA_CONTROL_PORT,
            monitoring: MECA_MONITORING_PORT,
        }
    }
}

impl Config {
    /// Load a configuration file from an explicit path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MecaError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_yaml(&contents)
    }

    /// Parse a configuration document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        if config.robot.host.trim().is_empty() {
            return Err(MecaError::Config("robot.host must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Default configuration pointing at the given host
    pub fn for_host(host: &str) -> Self {
        Self {
            robot: RobotConfig {
                host: host.to_string(),
                ports: PortConfig::default(),
            },
            ..Self::default()
        }
    }

    pub fn control_address(&self) -> String {
        format!("{}:{}", self.robot.host, self.robot.ports.control)
    }

    pub fn monitoring_address(&self) -> String {
        format!("{}:{}", self.robot.host, self.robot.ports.monitoring)
    }
}

impl ConnectionConfig {
    /// TCP connect timeout (protocol convention: 100ms)
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(100))
    }

    /// Wait for the welcome frame after connecting
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.unwrap_or(10))
    }

    /// Default reply timeout for a command exchange
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs.unwrap_or(20))
    }

    /// Pause between teardown and reconnect after a transport failure
    pub fn reconnect_pause(&self) -> Duration {
        Duration::from_millis(self.reconnect_pause_ms.unwrap_or(1000))
    }

    pub fn status_query_attempts(&self) -> u32 {
        self.status_query_attempts.unwrap_or(5)
    }
}

impl MonitoringConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.unwrap_or(100))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms.unwrap_or(1000))
    }

    pub fn pub_rate_hz(&self) -> u32 {
        self.pub_rate_hz.unwrap_or(10)
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places.unwrap_or(4)
    }
}

impl FirmwareConfig {
    pub fn reboot_wait(&self) -> Duration {
        Duration::from_secs(self.reboot_wait_secs.unwrap_or(40))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(2))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(10))
    }
}
