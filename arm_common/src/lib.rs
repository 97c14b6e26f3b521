//! Arm Common Library
//!
//! This crate provides shared constants, value types and configuration
//! loading for the robotic-arm simulator workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Alarm codes, motion limits, tunable defaults
//! - [`types`] - Pose, effector status and published snapshots
//! - [`config`] - Configuration loading traits and types
//! - [`tunables`] - Environment-sourced simulation tunables
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use arm_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod tunables;
pub mod types;
