//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the simulator's TOML
//! configuration: the service block, the refresh loop settings, motion
//! program definitions and robot definitions.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arm_common::config::{load_sim_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_sim_config(Path::new("config/simulator.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::DEFAULT_REFRESH_RATE_S;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files or tunables.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common service fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "arm-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a halted robot picks its program position back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Keep the absolute start reference: the program jumps ahead by the
    /// time spent halted.
    #[default]
    Skip,
    /// Shift the start reference by the halted time: the program continues
    /// from the sample it froze on.
    InPlace,
}

fn default_refresh_rate() -> f64 {
    DEFAULT_REFRESH_RATE_S
}

/// Refresh loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Tick interval in seconds.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: f64,

    /// Resume semantics after a stop or a cleared alarm.
    #[serde(default)]
    pub resume_mode: ResumeMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            refresh_rate: DEFAULT_REFRESH_RATE_S,
            resume_mode: ResumeMode::default(),
        }
    }
}

/// One motion program source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramConfig {
    /// Program id referenced by robots
    pub program: u32,
    /// Tab-delimited program file (relative to the config directory)
    pub path: PathBuf,
    /// Total cycle duration in seconds
    pub time_length: f64,
}

/// One simulated robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    pub label: String,
    pub serial_number: String,
    pub id: u32,
    pub name: String,
    /// Program id to replay
    pub program: u32,
    pub version: String,
    #[serde(default)]
    pub laser: bool,
    #[serde(default)]
    pub suction_cup: bool,
    #[serde(default)]
    pub gripper: bool,
}

/// Full simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub programs: Vec<ProgramConfig>,
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
}

impl SimConfig {
    /// Validate the simulator configuration.
    ///
    /// # Validation Rules
    /// 1. `shared` block valid
    /// 2. `refresh_rate` > 0 and finite
    /// 3. At least one robot
    /// 4. Program ids unique, `time_length` > 0
    /// 5. Robot labels unique and non-empty
    /// 6. Every robot references a defined program
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !(self.server.refresh_rate.is_finite() && self.server.refresh_rate > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "refresh_rate must be a positive number of seconds, got {}",
                self.server.refresh_rate
            )));
        }

        if self.robots.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one robot must be configured".to_string(),
            ));
        }

        let mut program_ids = HashSet::new();
        for p in &self.programs {
            if !program_ids.insert(p.program) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate program id: {}",
                    p.program
                )));
            }
            if !(p.time_length.is_finite() && p.time_length > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "program {}: time_length must be positive, got {}",
                    p.program, p.time_length
                )));
            }
        }

        let mut labels = HashSet::new();
        for r in &self.robots {
            if r.label.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "robot id {} has an empty label",
                    r.id
                )));
            }
            if r.label.contains(|c: char| c == ',' || c.is_whitespace()) {
                return Err(ConfigError::ValidationError(format!(
                    "robot label '{}' may not contain commas or whitespace",
                    r.label
                )));
            }
            if !labels.insert(r.label.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate robot label: {}",
                    r.label
                )));
            }
            if !program_ids.contains(&r.program) {
                return Err(ConfigError::ValidationError(format!(
                    "robot '{}' references undefined program {}",
                    r.label, r.program
                )));
            }
        }

        Ok(())
    }

    /// Program definition by id.
    pub fn program(&self, id: u32) -> Option<&ProgramConfig> {
        self.programs.iter().find(|p| p.program == id)
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Load and validate a simulator config, resolving program paths against
/// the config file's directory.
pub fn load_sim_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let mut config = SimConfig::load(path)?;
    config.validate()?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for program in &mut config.programs {
        program.path = resolve_path(base, &program.path);
    }

    tracing::info!(
        "Loaded config {:?}: {} programs, {} robots",
        path,
        config.programs.len(),
        config.robots.len()
    );
    Ok(config)
}

/// Resolve a possibly relative path against a base directory.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
