//! Simulator value types.
//!
//! This module defines the data exchanged between the engine and its
//! collaborators:
//! - `Pose` - Cartesian coordinates plus joint angles
//! - `EffectorStatus` / `EffectorReading` - Tool state (`[true, v]` / `[false]`)
//! - `RobotSnapshot` - Outward fields published every tick
//! - `RobotIdentity` - Static fields published once at registration

use crate::consts::{POSE_COORDS, POSE_JOINTS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arm configuration: 4 Cartesian-like coordinates and 4 joint angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// x, y, z and end-effector rotation
    pub coords: [f64; POSE_COORDS],
    /// Joint angles in degrees
    pub joints: [f64; POSE_JOINTS],
}

impl Pose {
    /// Create a pose from its two halves.
    pub const fn new(coords: [f64; POSE_COORDS], joints: [f64; POSE_JOINTS]) -> Self {
        Self { coords, joints }
    }

    /// Flattened 8-number view: coordinates first, then joints.
    pub fn to_vector(&self) -> [f64; POSE_COORDS + POSE_JOINTS] {
        let mut out = [0.0; POSE_COORDS + POSE_JOINTS];
        out[..POSE_COORDS].copy_from_slice(&self.coords);
        out[POSE_COORDS..].copy_from_slice(&self.joints);
        out
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.to_vector().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Value carried by an installed effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectorReading {
    /// Value taken from the current motion-program sample.
    Value(f64),
    /// Configured placeholder, reported until the first sample is applied.
    Placeholder(String),
}

impl fmt::Display for EffectorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Placeholder(s) => f.write_str(s),
        }
    }
}

/// State of one effector slot.
///
/// `Enabled` is only ever produced for an installed effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectorStatus {
    /// Effector not installed; rendered `[false]`.
    Disabled,
    /// Effector installed; rendered `[true, value]`.
    Enabled(EffectorReading),
}

impl EffectorStatus {
    /// Initial status for a slot given its capability flag.
    pub fn initial(installed: bool, placeholder: &str) -> Self {
        if installed {
            Self::Enabled(EffectorReading::Placeholder(placeholder.to_string()))
        } else {
            Self::Disabled
        }
    }

    /// Status for a slot after applying a program sample value.
    pub fn sampled(installed: bool, value: f64) -> Self {
        if installed {
            Self::Enabled(EffectorReading::Value(value))
        } else {
            Self::Disabled
        }
    }

    /// Whether the slot reports an installed effector.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }
}

impl fmt::Display for EffectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("[false]"),
            Self::Enabled(reading) => write!(f, "[true, {reading}]"),
        }
    }
}

/// Per-robot fields pushed to the transport on every tick and query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSnapshot {
    /// Robot label
    pub label: String,
    /// Stringified 8-number pose vector
    pub pose: String,
    /// Alarm code (0 = none)
    pub alarm: u16,
    /// Running (true) or halted (false)
    pub work_status: bool,
    /// `[true, v]` or `[false]`
    pub laser: String,
    /// `[true, v]` or `[false]`
    pub suction_cup: String,
    /// `[true, v]` or `[false]`
    pub gripper: String,
}

/// Static per-robot fields, published once when the robot is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotIdentity {
    pub label: String,
    pub id: u32,
    pub serial_number: String,
    pub name: String,
    pub version: String,
    pub program: u32,
    /// Stringified home pose (sample 0 of the program)
    pub home: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_renders_as_flat_vector() {
        let pose = Pose::new([200.0, 0.0, 50.5, -10.0], [0.0, 30.0, 40.0, 12.25]);
        assert_eq!(pose.to_string(), "[200, 0, 50.5, -10, 0, 30, 40, 12.25]");
    }

    #[test]
    fn effector_rendering() {
        assert_eq!(EffectorStatus::Disabled.to_string(), "[false]");
        assert_eq!(EffectorStatus::sampled(true, 1.0).to_string(), "[true, 1]");
        assert_eq!(
            EffectorStatus::initial(true, "False").to_string(),
            "[true, False]"
        );
    }

    #[test]
    fn uninstalled_effector_never_enabled() {
        assert!(!EffectorStatus::sampled(false, 5.0).is_enabled());
        assert!(!EffectorStatus::initial(false, "False").is_enabled());
    }
}
