//! # Robotic-Arm Simulator
//!
//! Simulates a fleet of robotic-arm controllers: each robot replays a
//! looping motion program, reports pose and effector state, and randomly
//! raises and clears alarms.
//!
//! # Module Structure
//!
//! - [`program`] - Motion program loading and time indexing
//! - [`alarm`] - Alarm detection and random draw sources
//! - [`robot`] - Robot definitions and mutable state
//! - [`recompute`] - Pure state transition
//! - [`clock`] - Time sources
//! - [`supervisor`] - Registry, commands and periodic tick
//! - [`publish`] - Outbound publishing seam
//! - [`command`] - Text command parser and dispatcher
//! - [`error`] - Error aggregate
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        arm_sim                                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐  │
//! │  │  Commands   │───►│  Supervisor  │───►│    Publisher     │  │
//! │  │ (stdin/...) │    │ (tick loop)  │    │ (log/json/...)   │  │
//! │  └─────────────┘    └──────┬───────┘    └──────────────────┘  │
//! │                            │ per-robot lock                   │
//! │                            ▼                                  │
//! │                   ┌────────────────┐                          │
//! │                   │  recompute()   │──► AlarmDetector         │
//! │                   │  (pure)        │──► MotionProgram         │
//! │                   └────────────────┘                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod alarm;
pub mod clock;
pub mod command;
pub mod error;
pub mod program;
pub mod publish;
pub mod recompute;
pub mod robot;
pub mod supervisor;

// Re-export key types for convenience
pub use crate::command::{Command, CommandError, Reply, dispatch, execute, spawn_line_reader};
pub use crate::error::{SimError, SimResult};
pub use crate::program::{MotionProgram, ProgramError};
pub use crate::publish::{JsonLinesPublisher, PublishError, Publisher, TracingPublisher};
pub use crate::supervisor::Supervisor;
