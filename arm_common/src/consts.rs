//! System-wide constants for the simulator workspace.
//!
//! Single source of truth for alarm codes, motion limits and tunable
//! defaults. Both workspace crates read these values from here.

/// Number of Cartesian coordinates in a pose (x, y, z, r).
pub const POSE_COORDS: usize = 4;

/// Number of joint angles in a pose.
pub const POSE_JOINTS: usize = 4;

// ─── Alarm codes ────────────────────────────────────────────────────

/// No alarm.
pub const ALARM_NONE: u16 = 0x00;

/// Joint outside its limit (inverse resolve failure).
pub const ALARM_JOINT_LIMIT: u16 = 0x12;

/// Cartesian position outside the reachable workspace.
pub const ALARM_MOTION_LIMIT: u16 = 0x21;

/// First step-loss code; the four variants are `0x50..=0x53`.
pub const ALARM_STEP_LOSS_BASE: u16 = 0x50;

/// Number of independent step-loss sources.
pub const STEP_LOSS_SOURCES: u16 = 4;

// ─── Motion limits ──────────────────────────────────────────────────

/// Nominal joint limits in degrees, `[min, max]` per joint.
pub const JOINT_LIMITS: [[f64; 2]; POSE_JOINTS] =
    [[-90.0, 90.0], [0.0, 85.0], [-10.0, 90.0], [-90.0, 90.0]];

/// Margin (degrees) by which the joint trigger band is tighter than nominal.
pub const JOINT_TRIGGER_MARGIN: f64 = 2.0;

/// Nominal Cartesian limits, `[min, max]` per coordinate.
pub const COORD_LIMITS: [[f64; 2]; POSE_COORDS] = [
    [-50.0, 350.0],
    [-50.0, 350.0],
    [-200.0, 200.0],
    [-130.0, 130.0],
];

/// Margin by which the Cartesian trigger band is tighter than nominal.
pub const COORD_TRIGGER_MARGIN: f64 = 3.0;

/// Step-loss draws are taken from `[1, STEP_LOSS_SCALE × probability_range]`.
pub const STEP_LOSS_SCALE: u32 = 100;

// ─── Tunable defaults ───────────────────────────────────────────────

/// Default `PROBABILITY_RANGE` (one alarm per 10 000 out-of-band evaluations).
pub const DEFAULT_PROBABILITY_RANGE: u32 = 10_000;

/// Default `ALARM_CLEARED`: seconds an alarm must age before it may clear.
pub const DEFAULT_ALARM_CLEARED_S: f64 = 900.0;

/// Default `ALARMS_RANGE`: one-in-N chance of clearing per eligible tick.
pub const DEFAULT_ALARMS_RANGE: u32 = 20;

/// Default `DEFAULT_WORK_STATUS`: robots start running.
pub const DEFAULT_WORK_STATUS: bool = true;

/// Default `EFFECTOR_STATUS` placeholder reported before the first sample.
pub const DEFAULT_EFFECTOR_STATUS: &str = "False";

/// Default refresh (tick) interval in seconds.
pub const DEFAULT_REFRESH_RATE_S: f64 = 1.0;

/// Status returned by the all-robot commands.
pub const COMMAND_STATUS_OK: i16 = 0;

/// Sentinel reply when a robot label is unknown.
pub const NOT_FOUND: &str = "not found";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_bands_stay_inside_nominal_limits() {
        for [lo, hi] in JOINT_LIMITS {
            assert!(lo + JOINT_TRIGGER_MARGIN < hi - JOINT_TRIGGER_MARGIN);
        }
        for [lo, hi] in COORD_LIMITS {
            assert!(lo + COORD_TRIGGER_MARGIN < hi - COORD_TRIGGER_MARGIN);
        }
    }

    #[test]
    fn step_loss_codes_are_contiguous() {
        let last = ALARM_STEP_LOSS_BASE + STEP_LOSS_SOURCES - 1;
        assert_eq!(last, 0x53);
        assert!(ALARM_STEP_LOSS_BASE > ALARM_MOTION_LIMIT);
    }

    #[test]
    fn defaults_are_usable() {
        assert!(DEFAULT_PROBABILITY_RANGE >= 1);
        assert!(DEFAULT_ALARMS_RANGE >= 1);
        assert!(DEFAULT_ALARM_CLEARED_S > 0.0);
        assert!(DEFAULT_REFRESH_RATE_S > 0.0);
    }
}
