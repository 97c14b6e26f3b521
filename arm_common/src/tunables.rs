//! Environment-sourced simulation tunables.
//!
//! Read once at startup; immutable afterwards.
//!
//! | Variable              | Default | Meaning |
//! |-----------------------|---------|---------|
//! | `PROBABILITY_RANGE`   | 10000   | 1-in-N alarm chance per out-of-band evaluation |
//! | `ALARM_CLEARED`       | 900     | Seconds before an alarm may clear |
//! | `ALARMS_RANGE`        | 20      | 1-in-N clearing chance per eligible evaluation |
//! | `DEFAULT_WORK_STATUS` | true    | Initial work status of every robot |
//! | `EFFECTOR_STATUS`     | False   | Placeholder reported by installed effectors before the first sample |

use crate::config::ConfigError;
use crate::consts::{
    DEFAULT_ALARM_CLEARED_S, DEFAULT_ALARMS_RANGE, DEFAULT_EFFECTOR_STATUS,
    DEFAULT_PROBABILITY_RANGE, DEFAULT_WORK_STATUS,
};
use std::str::FromStr;

/// Simulation tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    /// Alarm draws succeed with probability `1 / probability_range`.
    pub probability_range: u32,
    /// Minimum alarm age (seconds) before clearing is attempted.
    pub alarm_cleared_s: f64,
    /// Clearing draws succeed with probability `1 / alarms_range`.
    pub alarms_range: u32,
    /// Initial work status.
    pub default_work_status: bool,
    /// Placeholder effector value.
    pub effector_status: String,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            probability_range: DEFAULT_PROBABILITY_RANGE,
            alarm_cleared_s: DEFAULT_ALARM_CLEARED_S,
            alarms_range: DEFAULT_ALARMS_RANGE,
            default_work_status: DEFAULT_WORK_STATUS,
            effector_status: DEFAULT_EFFECTOR_STATUS.to_string(),
        }
    }
}

impl Tunables {
    /// Read tunables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read tunables through an arbitrary key lookup.
    ///
    /// Missing keys take their defaults; present but malformed keys are an
    /// error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let probability_range =
            parse_or("PROBABILITY_RANGE", &lookup, defaults.probability_range)?;
        let alarm_cleared_s = parse_or("ALARM_CLEARED", &lookup, defaults.alarm_cleared_s)?;
        let alarms_range = parse_or("ALARMS_RANGE", &lookup, defaults.alarms_range)?;
        let default_work_status = match lookup("DEFAULT_WORK_STATUS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "DEFAULT_WORK_STATUS must be a boolean, got '{raw}'"
                ))
            })?,
            None => defaults.default_work_status,
        };
        let effector_status = lookup("EFFECTOR_STATUS").unwrap_or(defaults.effector_status);

        let tunables = Self {
            probability_range,
            alarm_cleared_s,
            alarms_range,
            default_work_status,
            effector_status,
        };
        tunables.validate()?;
        Ok(tunables)
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probability_range == 0 {
            return Err(ConfigError::ValidationError(
                "PROBABILITY_RANGE must be at least 1".to_string(),
            ));
        }
        if self.alarms_range == 0 {
            return Err(ConfigError::ValidationError(
                "ALARMS_RANGE must be at least 1".to_string(),
            ));
        }
        if !(self.alarm_cleared_s.is_finite() && self.alarm_cleared_s >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "ALARM_CLEARED must be a non-negative number of seconds, got {}",
                self.alarm_cleared_s
            )));
        }
        Ok(())
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("{key}: cannot parse '{raw}'"))
        }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
