use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ambient temperature reported for a joint that has never received a
/// thermal sample, in degrees Celsius.
pub const AMBIENT_CELSIUS: f64 = 20.0;

/// One inertial sample for a joint: linear acceleration and angular rate,
/// each as `[x, y, z]`.
///
/// Samples arrive opportunistically from the sensor collaborator; only the
/// latest one is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Linear acceleration in m/s².
    pub accel: [f64; 3],
    /// Angular velocity in rad/s.
    pub gyro: [f64; 3],
}

/// Temperature channels reported by one actuator, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub motor_winding: f64,
    pub motor_housing: f64,
    pub board: f64,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            motor_winding: AMBIENT_CELSIUS,
            motor_housing: AMBIENT_CELSIUS,
            board: AMBIENT_CELSIUS,
        }
    }
}

/// Inbound command for a whole group, index-aligned with the group roster.
///
/// Each axis vector may be shorter than the roster (or hold a non-finite
/// value); the affected axis is then treated as unset for that joint rather
/// than rejecting the command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupCommand {
    /// Position targets in radians, one per roster index.
    pub position: Vec<f64>,
    /// Velocity targets in rad/s, one per roster index.
    pub velocity: Vec<f64>,
    /// Effort targets in N·m, one per roster index.
    pub effort: Vec<f64>,
}

/// Aggregated per-tick feedback for a whole group.
///
/// All vectors are sized to the roster at group creation and a joint's slot
/// never moves afterwards. The `*_command` echo fields report the most
/// recently stored target for each axis and hold `NaN` until a command for
/// that axis has been received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupFeedback {
    pub names: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
    pub position_command: Vec<f64>,
    pub velocity_command: Vec<f64>,
    pub effort_command: Vec<f64>,
    pub accelerometer: Vec<[f64; 3]>,
    pub gyro: Vec<[f64; 3]>,
    pub motor_winding_temperature: Vec<f64>,
    pub motor_housing_temperature: Vec<f64>,
    pub board_temperature: Vec<f64>,
}

impl GroupFeedback {
    /// Create a record sized for `names`, with measured fields zeroed,
    /// temperatures at ambient, and command echoes at `NaN` (no command
    /// received yet).
    pub fn sized(names: Vec<String>) -> Self {
        let n = names.len();
        Self {
            names,
            position: vec![0.0; n],
            velocity: vec![0.0; n],
            effort: vec![0.0; n],
            position_command: vec![f64::NAN; n],
            velocity_command: vec![f64::NAN; n],
            effort_command: vec![f64::NAN; n],
            accelerometer: vec![[0.0; 3]; n],
            gyro: vec![[0.0; 3]; n],
            motor_winding_temperature: vec![AMBIENT_CELSIUS; n],
            motor_housing_temperature: vec![AMBIENT_CELSIUS; n],
            board_temperature: vec![AMBIENT_CELSIUS; n],
        }
    }

    /// Number of joint slots in the record.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the record has no joint slots.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Partial per-axis gain override carried by a settings change.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AxisSettings {
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub kd: Option<f64>,
    pub feed_forward: Option<f64>,
}

/// Runtime settings override for a single joint ("change settings").
///
/// Applying an override rewrites only the provided fields of the joint's
/// effective gain profile and never resets controller state, so the integral
/// term carries across a gain change.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JointSettings {
    pub position: AxisSettings,
    pub velocity: AxisSettings,
    pub effort: AxisSettings,
    /// Replacement output clamp `[low, high]`, in N·m.
    pub force_limits: Option<(f64, f64)>,
}

/// Expand a family/name roster request into fully qualified joint names.
///
/// Mirrors the group-creation convention of the actuator network: a single
/// family is applied to every name; otherwise families and names are zipped
/// pairwise when the lists have equal length. Any other combination yields
/// an empty roster.
pub fn expand_roster(families: &[String], names: &[String]) -> Vec<String> {
    let mut roster = Vec::new();
    if families.len() == 1 {
        for name in names {
            roster.push(format!("{}/{}", families[0], name));
        }
    } else if families.len() == names.len() {
        for (family, name) in families.iter().zip(names) {
            roster.push(format!("{family}/{name}"));
        }
    }
    roster
}

/// Global error type for group lifecycle and physics-seam failures.
///
/// Nothing inside the per-tick control path returns these; a real-time loop
/// degrades to "do nothing to this joint" instead of stalling the physics
/// step.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimError {
    #[error("group '{0}' already exists")]
    GroupExists(String),

    #[error("no group named '{0}'")]
    UnknownGroup(String),

    #[error("no joint named '{0}' in this group")]
    UnknownJoint(String),

    #[error("physics fault on {joint}: {details}")]
    PhysicsFault { joint: String, details: String },
}
