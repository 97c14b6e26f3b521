//! Prelude module for common re-exports.
//!
//! Consumers can do `use arm_common::prelude::*;` and get the most
//! important types without listing individual paths.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ProgramConfig, ResumeMode, RobotConfig, ServerConfig,
    SharedConfig, SimConfig, load_sim_config,
};
pub use crate::tunables::Tunables;

// ─── Alarm codes ────────────────────────────────────────────────────
pub use crate::consts::{
    ALARM_JOINT_LIMIT, ALARM_MOTION_LIMIT, ALARM_NONE, ALARM_STEP_LOSS_BASE,
};

// ─── Value types ────────────────────────────────────────────────────
pub use crate::types::{EffectorReading, EffectorStatus, Pose, RobotIdentity, RobotSnapshot};
