//! Per-robot definition and mutable state.

use crate::program::MotionProgram;
use arm_common::config::{ResumeMode, RobotConfig};
use arm_common::consts::ALARM_NONE;
use arm_common::types::{EffectorStatus, Pose, RobotIdentity, RobotSnapshot};
use std::sync::Arc;

/// Which effectors are installed on a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub laser: bool,
    pub suction_cup: bool,
    pub gripper: bool,
}

/// Immutable identity and capability record, paired 1:1 with a `RobotState`.
#[derive(Debug, Clone)]
pub struct RobotDefinition {
    pub label: String,
    pub id: u32,
    pub serial_number: String,
    pub name: String,
    pub version: String,
    pub capabilities: Capabilities,
    /// Home pose, sample 0 of the program
    pub home: Pose,
    program: Arc<MotionProgram>,
}

impl RobotDefinition {
    /// Bind a robot config to its (shared) motion program.
    pub fn new(config: &RobotConfig, program: Arc<MotionProgram>) -> Self {
        Self {
            label: config.label.clone(),
            id: config.id,
            serial_number: config.serial_number.clone(),
            name: config.name.clone(),
            version: config.version.clone(),
            capabilities: Capabilities {
                laser: config.laser,
                suction_cup: config.suction_cup,
                gripper: config.gripper,
            },
            home: program.home(),
            program,
        }
    }

    pub fn program(&self) -> &MotionProgram {
        &self.program
    }

    /// Static fields published once at registration.
    pub fn identity(&self) -> RobotIdentity {
        RobotIdentity {
            label: self.label.clone(),
            id: self.id,
            serial_number: self.serial_number.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            program: self.program.id(),
            home: self.home.to_string(),
        }
    }
}

/// Mutable per-robot record; the unit of concurrency control.
///
/// Invariants:
/// - `alarm != 0` implies `!work_status`
/// - `0 <= runtime_s < program duration` while running
/// - an effector slot is `Enabled` only when the capability is installed
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub pose: Pose,
    /// Alarm code, 0 when clear
    pub alarm: u16,
    /// When the current alarm was raised (seconds)
    pub alarm_timer: f64,
    pub work_status: bool,
    pub laser: EffectorStatus,
    pub suction_cup: EffectorStatus,
    pub gripper: EffectorStatus,
    /// Seconds into the current program cycle
    pub runtime_s: f64,
    /// Reference instant (seconds) the program cycle is measured from
    pub start_reference: f64,
    /// When the robot last stopped progressing, if halted
    pub halted_at: Option<f64>,
}

impl RobotState {
    /// Startup state: home pose, no alarm, placeholder effectors.
    pub fn initial(
        def: &RobotDefinition,
        work_status: bool,
        effector_placeholder: &str,
        now: f64,
    ) -> Self {
        let caps = def.capabilities;
        Self {
            pose: def.home,
            alarm: ALARM_NONE,
            alarm_timer: 0.0,
            work_status,
            laser: EffectorStatus::initial(caps.laser, effector_placeholder),
            suction_cup: EffectorStatus::initial(caps.suction_cup, effector_placeholder),
            gripper: EffectorStatus::initial(caps.gripper, effector_placeholder),
            runtime_s: 0.0,
            start_reference: now,
            halted_at: (!work_status).then_some(now),
        }
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.alarm != ALARM_NONE
    }

    /// Stop progressing. Keeps the first halt time if already halted.
    pub fn halt(&mut self, now: f64) {
        self.work_status = false;
        self.halted_at.get_or_insert(now);
    }

    /// Start progressing again.
    ///
    /// With `ResumeMode::InPlace` the start reference is moved forward by
    /// the time spent halted, so the cycle continues where it froze.
    pub fn resume(&mut self, mode: ResumeMode, now: f64) {
        self.work_status = true;
        if let Some(halted_at) = self.halted_at.take() {
            if mode == ResumeMode::InPlace {
                self.start_reference += (now - halted_at).max(0.0);
            }
        }
    }

    /// Outward fields for the transport.
    pub fn snapshot(&self, label: &str) -> RobotSnapshot {
        RobotSnapshot {
            label: label.to_string(),
            pose: self.pose.to_string(),
            alarm: self.alarm,
            work_status: self.work_status,
            laser: self.laser.to_string(),
            suction_cup: self.suction_cup.to_string(),
            gripper: self.gripper.to_string(),
        }
    }

    /// Check the structural invariants against a definition.
    pub fn check_invariants(&self, def: &RobotDefinition) -> Result<(), String> {
        if self.is_faulted() && self.work_status {
            return Err(format!("alarm {:#04x} raised while running", self.alarm));
        }
        if self.work_status
            && !(0.0..def.program().duration_s()).contains(&self.runtime_s)
        {
            return Err(format!("runtime {} outside program cycle", self.runtime_s));
        }
        let caps = def.capabilities;
        for (name, status, installed) in [
            ("laser", &self.laser, caps.laser),
            ("suction_cup", &self.suction_cup, caps.suction_cup),
            ("gripper", &self.gripper, caps.gripper),
        ] {
            if status.is_enabled() && !installed {
                return Err(format!("{name} reported without capability"));
            }
        }
        Ok(())
    }
}
