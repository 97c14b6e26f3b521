//! Outbound publishing seam.
//!
//! The supervisor hands every snapshot to a [`Publisher`] after the robot's
//! lock has been released. Identities are registered once at startup.
//!
//! Implementations:
//! - [`TracingPublisher`] - Writes snapshots to the log
//! - [`JsonLinesPublisher`] - Appends one JSON object per event to a file
//! - [`MemoryPublisher`] - Keeps everything in memory (tests, embedding)

use arm_common::types::{RobotIdentity, RobotSnapshot};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Publishing failure. Never fatal to the tick loop.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Publisher closed")]
    Closed,
}

/// Sink for per-robot fields.
pub trait Publisher: Send + Sync {
    /// Publish the static fields of a robot. Called once per robot.
    fn register(&self, identity: &RobotIdentity) -> Result<(), PublishError>;

    /// Publish the outward fields of a robot after a recomputation.
    fn publish(&self, snapshot: &RobotSnapshot) -> Result<(), PublishError>;

    /// Called once at the end of every tick.
    fn flush(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

// ─── Tracing ────────────────────────────────────────────────────────

/// Logs registrations at `info` and snapshots at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl Publisher for TracingPublisher {
    fn register(&self, identity: &RobotIdentity) -> Result<(), PublishError> {
        info!(
            "Registered robot {} (id {}, serial {}, program {}, home {})",
            identity.label, identity.id, identity.serial_number, identity.program, identity.home
        );
        Ok(())
    }

    fn publish(&self, snapshot: &RobotSnapshot) -> Result<(), PublishError> {
        debug!(
            robot = %snapshot.label,
            alarm = snapshot.alarm,
            work_status = snapshot.work_status,
            laser = %snapshot.laser,
            suction_cup = %snapshot.suction_cup,
            gripper = %snapshot.gripper,
            "pose {}",
            snapshot.pose
        );
        Ok(())
    }
}

// ─── JSON lines ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Register {
        #[serde(flatten)]
        identity: &'a RobotIdentity,
    },
    Update {
        #[serde(flatten)]
        snapshot: &'a RobotSnapshot,
    },
}

/// Appends `{"event": "register" | "update", ...}` lines to a file.
pub struct JsonLinesPublisher {
    path: PathBuf,
    out: Mutex<Option<BufWriter<File>>>,
}

impl JsonLinesPublisher {
    /// Create (truncate) the output file.
    pub fn create(path: &Path) -> Result<Self, PublishError> {
        let file = File::create(path).map_err(|source| PublishError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Publishing JSON lines to {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            out: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    fn write_event(&self, event: &Event<'_>) -> Result<(), PublishError> {
        let line = serde_json::to_string(event)?;
        let mut guard = self.out.lock();
        let out = guard.as_mut().ok_or(PublishError::Closed)?;
        writeln!(out, "{line}").map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> PublishError {
        PublishError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Flush and close the file. Later publishes fail with `Closed`.
    pub fn close(&self) -> Result<(), PublishError> {
        match self.out.lock().take() {
            Some(mut out) => out.flush().map_err(|source| self.io_error(source)),
            None => Ok(()),
        }
    }
}

impl Publisher for JsonLinesPublisher {
    fn register(&self, identity: &RobotIdentity) -> Result<(), PublishError> {
        self.write_event(&Event::Register { identity })
    }

    fn publish(&self, snapshot: &RobotSnapshot) -> Result<(), PublishError> {
        self.write_event(&Event::Update { snapshot })
    }

    fn flush(&self) -> Result<(), PublishError> {
        let mut guard = self.out.lock();
        let out = guard.as_mut().ok_or(PublishError::Closed)?;
        out.flush().map_err(|source| self.io_error(source))
    }
}

// ─── Memory ─────────────────────────────────────────────────────────

/// Records everything it is given.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    identities: Mutex<Vec<RobotIdentity>>,
    snapshots: Mutex<Vec<RobotSnapshot>>,
    flushes: Mutex<usize>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identities(&self) -> Vec<RobotIdentity> {
        self.identities.lock().clone()
    }

    pub fn snapshots(&self) -> Vec<RobotSnapshot> {
        self.snapshots.lock().clone()
    }

    /// Number of completed ticks.
    pub fn flushes(&self) -> usize {
        *self.flushes.lock()
    }
}

impl Publisher for MemoryPublisher {
    fn register(&self, identity: &RobotIdentity) -> Result<(), PublishError> {
        self.identities.lock().push(identity.clone());
        Ok(())
    }

    fn publish(&self, snapshot: &RobotSnapshot) -> Result<(), PublishError> {
        self.snapshots.lock().push(snapshot.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), PublishError> {
        *self.flushes.lock() += 1;
        Ok(())
    }
}
