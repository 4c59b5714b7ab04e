//! JSON-based robot monitoring
//!
//! Turns telemetry snapshots into JSON lines with change detection and
//! publication rate limiting. Positions are rate limited; status changes are
//! never dropped.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::commands::{GripperStatus, RobotStatus};
use crate::config::MonitoringConfig;
use crate::json_output::current_timestamp;
use crate::monitor::TelemetrySnapshot;

/// Joint and pose output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// System timestamp when the snapshot was taken
    pub stime: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Joint angles in degrees
    pub joints: Vec<f64>,
    /// Flange pose [x, y, z, alpha, beta, gamma]
    pub cartesian: Vec<f64>,
}

impl PositionData {
    pub fn new_rounded(joints: &[f64], cartesian: &[f64], stime: f64, decimal_places: u32) -> Self {
        let multiplier = 10.0_f64.powi(decimal_places as i32);
        let round = |values: &[f64]| -> Vec<f64> {
            values.iter().map(|v| (v * multiplier).round() / multiplier).collect()
        };

        Self {
            stime,
            event_type: "position".to_string(),
            joints: round(joints),
            cartesian: round(cartesian),
        }
    }
}

/// Robot and gripper status output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub stime: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot: Option<RobotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gripper: Option<GripperStatus>,
}

impl StatusData {
    pub fn new(robot_status: &[i64], gripper_status: &[i64], stime: f64) -> Self {
        Self {
            stime,
            event_type: "robot_status".to_string(),
            robot: RobotStatus::from_fields(robot_status),
            gripper: GripperStatus::from_fields(gripper_status),
        }
    }
}

/// One line of monitor output
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorRecord {
    Position(PositionData),
    Status(StatusData),
}

/// Monitor output manager that handles dynamic output and rate limiting
pub struct MonitorOutput {
    last_position: Option<(Vec<f64>, Vec<f64>)>,
    last_status: Option<(Vec<i64>, Vec<i64>)>,
    last_position_output: Option<Instant>,
    /// Position publication rate; 0 disables rate limiting
    pub_rate_hz: u32,
    /// Change threshold in degrees or millimetres
    position_threshold: f64,
    dynamic_mode: bool,
    pub decimal_places: u32,
}

impl MonitorOutput {
    pub fn new(pub_rate_hz: u32, dynamic_mode: bool, decimal_places: u32) -> Self {
        Self {
            last_position: None,
            last_status: None,
            last_position_output: None,
            pub_rate_hz,
            position_threshold: 0.001,
            dynamic_mode,
            decimal_places,
        }
    }

    pub fn from_config(config: &MonitoringConfig, dynamic_mode: bool) -> Self {
        Self::new(config.pub_rate_hz(), dynamic_mode, config.decimal_places())
    }

    /// Check if joints and pose should be output
    pub fn should_output_position(&mut self, joints: &[f64], cartesian: &[f64]) -> bool {
        self.should_output_position_at(Instant::now(), joints, cartesian)
    }

    fn should_output_position_at(&mut self, now: Instant, joints: &[f64], cartesian: &[f64]) -> bool {
        if joints.is_empty() && cartesian.is_empty() {
            return false;
        }

        if let (Some(last_output), Some(interval)) = (self.last_position_output, self.min_interval()) {
            if now.duration_since(last_output) < interval {
                return false;
            }
        }

        if self.dynamic_mode {
            if let Some((last_joints, last_cartesian)) = &self.last_position {
                if !self.positions_changed(last_joints, joints) && !self.positions_changed(last_cartesian, cartesian) {
                    return false;
                }
            }
        }

        self.last_position = Some((joints.to_vec(), cartesian.to_vec()));
        self.last_position_output = Some(now);
        true
    }

    /// Check if status should be output (never rate limited)
    pub fn should_output_status(&mut self, robot_status: &[i64], gripper_status: &[i64]) -> bool {
        if robot_status.is_empty() && gripper_status.is_empty() {
            return false;
        }

        let current = (robot_status.to_vec(), gripper_status.to_vec());
        if self.dynamic_mode && self.last_status.as_ref() == Some(&current) {
            return false;
        }

        self.last_status = Some(current);
        true
    }

    fn min_interval(&self) -> Option<Duration> {
        (self.pub_rate_hz > 0).then(|| Duration::from_millis(1000 / self.pub_rate_hz as u64))
    }

    fn positions_changed(&self, old: &[f64], new: &[f64]) -> bool {
        old.len() != new.len()
            || old
                .iter()
                .zip(new.iter())
                .any(|(old_val, new_val)| (old_val - new_val).abs() > self.position_threshold)
    }

    /// Records due for one snapshot, status first
    pub fn records(&mut self, snapshot: &TelemetrySnapshot) -> Vec<MonitorRecord> {
        let stime = current_timestamp();
        let mut records = Vec::new();

        if self.should_output_status(&snapshot.robot_status, &snapshot.gripper_status) {
            records.push(MonitorRecord::Status(StatusData::new(
                &snapshot.robot_status,
                &snapshot.gripper_status,
                stime,
            )));
        }
        if self.should_output_position(&snapshot.joints, &snapshot.cartesian) {
            records.push(MonitorRecord::Position(PositionData::new_rounded(
                &snapshot.joints,
                &snapshot.cartesian,
                stime,
                self.decimal_places,
            )));
        }
        records
    }

    /// Print every due record as a JSON line
    pub fn output_snapshot(&mut self, snapshot: &TelemetrySnapshot) -> usize {
        let records = self.records(snapshot);
        for record in &records {
            match record {
                MonitorRecord::Position(data) => self.output_position(data),
                MonitorRecord::Status(data) => {
                    if let Ok(json) = serde_json::to_string(data) {
                        println!("{}", json);
                    }
                }
            }
        }
        records.len()
    }

    /// Output position with consistent decimal formatting
    pub fn output_position(&self, data: &PositionData) {
        let format_values = |values: &[f64]| -> String {
            values
                .iter()
                .map(|v| format!("{:.prec$}", v, prec = self.decimal_places as usize))
                .collect::<Vec<_>>()
                .join(",")
        };

        println!(
            r#"{{"stime":{:.3},"type":"{}","joints":[{}],"cartesian":[{}]}}"#,
            data.stime,
            data.event_type,
            format_values(&data.joints),
            format_values(&data.cartesian)
        );
    }
}
