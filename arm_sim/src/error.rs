//! Simulator error aggregate.

use crate::program::ProgramError;
use crate::publish::PublishError;
use arm_common::config::ConfigError;
use thiserror::Error;

/// Startup and runtime errors surfaced by the simulator.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Motion program {program}: {source}")]
    Program {
        program: u32,
        #[source]
        source: ProgramError,
    },

    #[error("Robot '{label}' references undefined program {program}")]
    UnknownProgram { label: String, program: u32 },

    #[error("Duplicate robot label '{0}'")]
    DuplicateLabel(String),

    #[error("No robots defined")]
    NoRobots,

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Convenience result alias.
pub type SimResult<T> = Result<T, SimError>;
