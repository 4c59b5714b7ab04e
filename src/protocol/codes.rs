//! Response code tables
//!
//! The control port table maps a command name to the reply codes that
//! complete it. Which codes are expected also depends on the per-session
//! end-of-block (EOB) and end-of-movement (EOM) notification flags.
//!
//! The monitoring table maps streamed codes to telemetry fields and is
//! selected once from the robot's firmware version.

use semver::Version;

/// Welcome frame sent by the robot when the control connection is accepted
pub const CONNECTION_ACCEPTED: u32 = 3000;
/// Another client already holds the control connection
pub const ANOTHER_USER_CONNECTED: u32 = 3001;
/// End-of-movement acknowledgement
pub const END_OF_MOVEMENT: u32 = 3004;
/// End-of-block acknowledgement
pub const END_OF_BLOCK: u32 = 3012;

pub const ROBOT_STATUS: u32 = 2007;
pub const GRIPPER_STATUS: u32 = 2079;
pub const CONFIGURATION: u32 = 2029;
pub const JOINTS: u32 = 2026;
pub const POSE: u32 = 2027;
pub const FIRMWARE_VERSION: u32 = 2081;

pub const LEGACY_JOINTS: u32 = 2102;
pub const LEGACY_CARTESIAN: u32 = 2103;
pub const STREAM_JOINTS: u32 = 2210;
pub const STREAM_CARTESIAN: u32 = 2211;
pub const STREAM_JOINT_VELOCITY: u32 = 2212;
pub const STREAM_TORQUE_RATIO: u32 = 2213;
pub const STREAM_ACCELEROMETER: u32 = 2220;

/// First firmware major version streaming the dual-code telemetry table
pub const STREAMING_MAJOR_VERSION: u64 = 8;

const STATUS_ERROR_CODES: [u32; 6] = [3001, 3003, 3005, 3009, 3014, 3026];

/// Motion and configuration commands acknowledged with end-of-movement
const MOVEMENT_COMMANDS: [&str; 9] = [
    "MoveJoints",
    "MoveLin",
    "MoveLinRelTRF",
    "MoveLinRelWRF",
    "MovePose",
    "SetCartAcc",
    "SetJointAcc",
    "SetTRF",
    "SetWRF",
];

/// Check whether a code belongs to the robot's error ranges
pub fn is_error_code(code: u32) -> bool {
    (1000..=1038).contains(&code) || STATUS_ERROR_CODES.contains(&code)
}

/// Per-session notification flags
///
/// Both notifications are enabled by the firmware when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    pub end_of_block: bool,
    pub end_of_movement: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            end_of_block: true,
            end_of_movement: true,
        }
    }
}

/// Codes that complete an exchange for a given command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedCodes {
    /// Success codes in priority order
    pub success: Vec<u32>,
}

impl ExpectedCodes {
    pub fn is_success(&self, code: u32) -> bool {
        self.success.contains(&code)
    }

    pub fn is_error(&self, code: u32) -> bool {
        is_error_code(code)
    }
}

/// Success codes for a command name under the given session flags
///
/// Names are matched exactly; the command's arguments are not part of the name.
pub fn expected_codes(command_name: &str, flags: SessionFlags) -> ExpectedCodes {
    let success = match command_name {
        "ActivateRobot" => vec![2000, 2001],
        "DeactivateRobot" => vec![2004],
        "ActivateSim" => vec![2045],
        "DeactivateSim" => vec![2046],
        "ClearMotion" => vec![2044],
        "BrakesOn" => vec![2010],
        "BrakesOff" => vec![2008],
        "GetConf" => vec![CONFIGURATION],
        "GetJoints" => vec![JOINTS],
        "GetPose" => vec![POSE],
        "GetStatusRobot" => vec![ROBOT_STATUS],
        "GetStatusGripper" => vec![GRIPPER_STATUS],
        "GetFwVersion" => vec![FIRMWARE_VERSION],
        "Home" => vec![2002, 2003],
        "PauseMotion" => {
            let mut codes = vec![2042];
            if flags.end_of_movement {
                codes.push(END_OF_MOVEMENT);
            }
            codes
        }
        "ResetError" => vec![2005, 2006],
        "ResumeMotion" => vec![2043],
        "SetEOB" => vec![2054, 2055],
        "SetEOM" => vec![2052, 2053],
        other => {
            let mut codes = Vec::new();
            if flags.end_of_block {
                codes.push(END_OF_BLOCK);
            }
            if flags.end_of_movement && MOVEMENT_COMMANDS.contains(&other) {
                codes.push(END_OF_MOVEMENT);
            }
            codes
        }
    };

    ExpectedCodes { success }
}

/// Telemetry field a monitoring code updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryField {
    Joints,
    Cartesian,
    JointVelocity,
    TorqueRatio,
    Accelerometer,
    RobotStatus,
    GripperStatus,
}

/// Monitoring code table, selected from the firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryCodeTable {
    /// Firmware before the streaming table: one code per quantity
    Legacy,
    /// Legacy and real-time streaming codes, plus velocity/torque/accelerometer
    /// and the one-time status frame sent right after connecting
    Streaming,
}

const LEGACY_TABLE: &[(u32, TelemetryField)] = &[
    (LEGACY_JOINTS, TelemetryField::Joints),
    (LEGACY_CARTESIAN, TelemetryField::Cartesian),
];

const STREAMING_TABLE: &[(u32, TelemetryField)] = &[
    (JOINTS, TelemetryField::Joints),
    (STREAM_JOINTS, TelemetryField::Joints),
    (POSE, TelemetryField::Cartesian),
    (STREAM_CARTESIAN, TelemetryField::Cartesian),
    (STREAM_JOINT_VELOCITY, TelemetryField::JointVelocity),
    (STREAM_TORQUE_RATIO, TelemetryField::TorqueRatio),
    (STREAM_ACCELEROMETER, TelemetryField::Accelerometer),
    (ROBOT_STATUS, TelemetryField::RobotStatus),
    (GRIPPER_STATUS, TelemetryField::GripperStatus),
];

impl TelemetryCodeTable {
    pub fn for_version(version: &Version) -> Self {
        if version.major >= STREAMING_MAJOR_VERSION {
            Self::Streaming
        } else {
            Self::Legacy
        }
    }

    pub fn entries(&self) -> &'static [(u32, TelemetryField)] {
        match self {
            Self::Legacy => LEGACY_TABLE,
            Self::Streaming => STREAMING_TABLE,
        }
    }

    pub fn field_for(&self, code: u32) -> Option<TelemetryField> {
        self.entries()
            .iter()
            .find(|(entry, _)| *entry == code)
            .map(|(_, field)| *field)
    }

    /// Whether the first frame after connecting carries status snapshots
    pub fn sends_initial_status(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_ranges() {
        assert!(is_error_code(1000));
        assert!(is_error_code(1005));
        assert!(is_error_code(1038));
        assert!(!is_error_code(999));
        assert!(!is_error_code(1039));
        for code in [3001, 3003, 3005, 3009, 3014, 3026] {
            assert!(is_error_code(code), "{} should be an error code", code);
        }
        assert!(!is_error_code(3000));
        assert!(!is_error_code(3004));
        assert!(!is_error_code(3012));
        assert_eq!((0..10_000).filter(|code| is_error_code(*code)).count(), 45);
    }

    #[test]
    fn test_multi_code_commands() {
        let flags = SessionFlags::default();
        assert_eq!(expected_codes("ActivateRobot", flags).success, vec![2000, 2001]);
        assert_eq!(expected_codes("Home", flags).success, vec![2002, 2003]);
        assert_eq!(expected_codes("ResetError", flags).success, vec![2005, 2006]);
    }

    #[test]
    fn test_exact_name_match() {
        let flags = SessionFlags::default();
        assert_eq!(expected_codes("DeactivateRobot", flags).success, vec![2004]);
        assert_eq!(expected_codes("DeactivateSim", flags).success, vec![2046]);
    }

    #[test]
    fn test_pause_motion_follows_eom() {
        let on = SessionFlags::default();
        let off = SessionFlags { end_of_block: true, end_of_movement: false };
        assert_eq!(expected_codes("PauseMotion", on).success, vec![2042, 3004]);
        assert_eq!(expected_codes("PauseMotion", off).success, vec![2042]);
    }

    #[test]
    fn test_motion_commands_expect_eob_and_eom() {
        let flags = SessionFlags::default();
        assert_eq!(expected_codes("MoveJoints", flags).success, vec![3012, 3004]);
        assert_eq!(expected_codes("SetTRF", flags).success, vec![3012, 3004]);
        assert_eq!(expected_codes("SetBlending", flags).success, vec![3012]);

        let eom_only = SessionFlags { end_of_block: false, end_of_movement: true };
        assert_eq!(expected_codes("MoveLin", eom_only).success, vec![3004]);
        assert!(expected_codes("GripperOpen", eom_only).success.is_empty());

        let none = SessionFlags { end_of_block: false, end_of_movement: false };
        assert!(expected_codes("MovePose", none).success.is_empty());
    }

    #[test]
    fn test_status_commands_ignore_session_flags() {
        let none = SessionFlags { end_of_block: false, end_of_movement: false };
        assert_eq!(expected_codes("GetJoints", none).success, vec![2026]);
        assert_eq!(expected_codes("GetStatusRobot", none).success, vec![2007]);
    }

    #[test]
    fn test_table_selection_by_version() {
        let legacy = TelemetryCodeTable::for_version(&Version::new(7, 0, 6));
        let streaming = TelemetryCodeTable::for_version(&Version::new(8, 1, 6));

        assert_eq!(legacy, TelemetryCodeTable::Legacy);
        assert_eq!(streaming, TelemetryCodeTable::Streaming);
        assert!(!legacy.sends_initial_status());
        assert!(streaming.sends_initial_status());
    }

    #[test]
    fn test_code_lookup_per_table() {
        let legacy = TelemetryCodeTable::Legacy;
        assert_eq!(legacy.field_for(2102), Some(TelemetryField::Joints));
        assert_eq!(legacy.field_for(2103), Some(TelemetryField::Cartesian));
        assert_eq!(legacy.field_for(2210), None);
        assert_eq!(legacy.field_for(2007), None);

        let streaming = TelemetryCodeTable::Streaming;
        assert_eq!(streaming.field_for(2026), Some(TelemetryField::Joints));
        assert_eq!(streaming.field_for(2210), Some(TelemetryField::Joints));
        assert_eq!(streaming.field_for(2211), Some(TelemetryField::Cartesian));
        assert_eq!(streaming.field_for(2220), Some(TelemetryField::Accelerometer));
        assert_eq!(streaming.field_for(2102), None);
        assert_eq!(streaming.field_for(9999), None);
    }
}
