//! Robot command constructors and status decoding

use serde::{Deserialize, Serialize};

use crate::protocol::{Command, Value};

/// Six-value joint set or pose, in degrees and millimetres
pub type Vector6 = [f64; 6];

impl Command {
    pub fn activate_robot() -> Self {
        Self::new("ActivateRobot")
    }

    pub fn deactivate_robot() -> Self {
        Self::new("DeactivateRobot")
    }

    pub fn activate_sim() -> Self {
        Self::new("ActivateSim")
    }

    pub fn deactivate_sim() -> Self {
        Self::new("DeactivateSim")
    }

    pub fn switch_to_ethercat() -> Self {
        Self::new("SwitchToEtherCAT")
    }

    pub fn home() -> Self {
        Self::new("Home")
    }

    pub fn brakes_on() -> Self {
        Self::new("BrakesOn")
    }

    pub fn brakes_off() -> Self {
        Self::new("BrakesOff")
    }

    pub fn gripper_open() -> Self {
        Self::new("GripperOpen")
    }

    pub fn gripper_close() -> Self {
        Self::new("GripperClose")
    }

    pub fn pause_motion() -> Self {
        Self::new("PauseMotion")
    }

    pub fn resume_motion() -> Self {
        Self::new("ResumeMotion")
    }

    pub fn clear_motion() -> Self {
        Self::new("ClearMotion")
    }

    pub fn get_joints() -> Self {
        Self::new("GetJoints")
    }

    pub fn get_pose() -> Self {
        Self::new("GetPose")
    }

    pub fn get_conf() -> Self {
        Self::new("GetConf")
    }

    pub fn get_status_robot() -> Self {
        Self::new("GetStatusRobot")
    }

    pub fn get_status_gripper() -> Self {
        Self::new("GetStatusGripper")
    }

    pub fn get_fw_version() -> Self {
        Self::new("GetFwVersion")
    }

    /// Robot-side pause of `seconds`
    pub fn delay(seconds: f64) -> Self {
        Self::with_args("Delay", [seconds])
    }

    pub fn move_joints(joints: Vector6) -> Self {
        Self::with_args("MoveJoints", joints)
    }

    pub fn move_lin(pose: Vector6) -> Self {
        Self::with_args("MoveLin", pose)
    }

    /// Linear move relative to the tool reference frame
    pub fn move_lin_rel_trf(offset: Vector6) -> Self {
        Self::with_args("MoveLinRelTRF", offset)
    }

    /// Linear move relative to the world reference frame
    pub fn move_lin_rel_wrf(offset: Vector6) -> Self {
        Self::with_args("MoveLinRelWRF", offset)
    }

    pub fn move_pose(pose: Vector6) -> Self {
        Self::with_args("MovePose", pose)
    }

    /// Blending percentage, 0 to 100
    pub fn set_blending(percentage: f64) -> Self {
        Self::with_args("SetBlending", [percentage])
    }

    pub fn set_auto_conf(enabled: bool) -> Self {
        Self::with_args("SetAutoConf", [u8::from(enabled)])
    }

    pub fn set_cart_acc(percentage: f64) -> Self {
        Self::with_args("SetCartAcc", [percentage])
    }

    pub fn set_cart_ang_vel(degrees_per_second: f64) -> Self {
        Self::with_args("SetCartAngVel", [degrees_per_second])
    }

    pub fn set_cart_lin_vel(mm_per_second: f64) -> Self {
        Self::with_args("SetCartLinVel", [mm_per_second])
    }

    /// Arm configuration: shoulder, elbow and wrist, each -1 or 1
    pub fn set_conf(c1: i8, c3: i8, c5: i8) -> Self {
        Self::with_args("SetConf", [c1, c3, c5])
    }

    pub fn set_gripper_force(percentage: f64) -> Self {
        Self::with_args("SetGripperForce", [percentage])
    }

    pub fn set_gripper_vel(percentage: f64) -> Self {
        Self::with_args("SetGripperVel", [percentage])
    }

    pub fn set_joint_acc(percentage: f64) -> Self {
        Self::with_args("SetJointAcc", [percentage])
    }

    pub fn set_joint_vel(percentage: f64) -> Self {
        Self::with_args("SetJointVel", [percentage])
    }

    /// Tool reference frame relative to the flange
    pub fn set_trf(frame: Vector6) -> Self {
        Self::with_args("SetTRF", frame)
    }

    /// World reference frame relative to the base
    pub fn set_wrf(frame: Vector6) -> Self {
        Self::with_args("SetWRF", frame)
    }
}

/// Decoded `GetStatusRobot` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotStatus {
    pub activated: bool,
    pub homing: bool,
    pub simulation: bool,
    pub error: bool,
    pub paused: bool,
    pub eob: bool,
    pub eom: bool,
}

impl RobotStatus {
    pub fn from_fields(fields: &[i64]) -> Option<Self> {
        match fields {
            [activated, homing, simulation, error, paused, eob, eom, ..] => Some(Self {
                activated: *activated != 0,
                homing: *homing != 0,
                simulation: *simulation != 0,
                error: *error != 0,
                paused: *paused != 0,
                eob: *eob != 0,
                eom: *eom != 0,
            }),
            _ => None,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_ints().and_then(Self::from_fields)
    }
}

/// Decoded `GetStatusGripper` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GripperStatus {
    pub enabled: bool,
    pub homing: bool,
    pub holding_part: bool,
    pub limit_reached: bool,
    pub error: bool,
    pub force_overload: bool,
}

impl GripperStatus {
    pub fn from_fields(fields: &[i64]) -> Option<Self> {
        match fields {
            [enabled, homing, holding_part, limit_reached, error, force_overload, ..] => Some(Self {
                enabled: *enabled != 0,
                homing: *homing != 0,
                holding_part: *holding_part != 0,
                limit_reached: *limit_reached != 0,
                error: *error != 0,
                force_overload: *force_overload != 0,
            }),
            _ => None,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_ints().and_then(Self::from_fields)
    }
}
