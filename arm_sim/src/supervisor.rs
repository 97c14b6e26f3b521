//! Robot registry, command surface and periodic tick.
//!
//! The registry is built once and never changes shape afterwards: a `Vec`
//! of robot slots plus a label index. Each slot owns its state behind its
//! own lock, so commands and the tick only ever contend per robot.
//!
//! ─── Locking ───
//!
//! - A robot's lock is held across the whole read-modify-write, including
//!   the recomputation and the snapshot taken from the result.
//! - "now" is read after the lock is acquired, so per robot the clock
//!   values seen by successive operations never go backwards.
//! - Publishing happens after every lock has been released.

use crate::alarm::{Draw, ThreadRngDraw};
use crate::clock::{Clock, SystemClock};
use crate::error::{SimError, SimResult};
use crate::program::MotionProgram;
use crate::publish::{PublishError, Publisher};
use crate::recompute::{SimParams, Transition, recompute};
use crate::robot::{RobotDefinition, RobotState};
use arm_common::config::{ResumeMode, SimConfig};
use arm_common::consts::ALARM_NONE;
use arm_common::tunables::Tunables;
use arm_common::types::{RobotIdentity, RobotSnapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

struct RobotSlot {
    def: RobotDefinition,
    state: Mutex<RobotState>,
}

/// Owns every simulated robot.
pub struct Supervisor {
    robots: Vec<RobotSlot>,
    index: HashMap<String, usize>,
    params: SimParams,
    rng: Arc<dyn Draw>,
    clock: Arc<dyn Clock>,
}

impl Supervisor {
    /// Build from a validated config with the thread-local RNG and the
    /// wall clock.
    pub fn from_config(config: &SimConfig, tunables: &Tunables) -> SimResult<Self> {
        Self::with_sources(config, tunables, Arc::new(ThreadRngDraw), Arc::new(SystemClock))
    }

    /// Build from a config with explicit randomness and time sources.
    ///
    /// Every program referenced by a robot is loaded exactly once and shared.
    pub fn with_sources(
        config: &SimConfig,
        tunables: &Tunables,
        rng: Arc<dyn Draw>,
        clock: Arc<dyn Clock>,
    ) -> SimResult<Self> {
        let mut programs: HashMap<u32, Arc<MotionProgram>> = HashMap::new();
        let mut definitions = Vec::with_capacity(config.robots.len());

        for robot in &config.robots {
            let program = match programs.entry(robot.program) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let program_config = config.program(robot.program).ok_or_else(|| {
                        SimError::UnknownProgram {
                            label: robot.label.clone(),
                            program: robot.program,
                        }
                    })?;
                    let program = MotionProgram::load(program_config).map_err(|source| {
                        SimError::Program {
                            program: robot.program,
                            source,
                        }
                    })?;
                    Arc::clone(entry.insert(Arc::new(program)))
                }
            };
            definitions.push(RobotDefinition::new(robot, program));
        }

        Self::new(
            definitions,
            tunables,
            config.server.resume_mode,
            rng,
            clock,
        )
    }

    /// Build from ready-made definitions, in registration order.
    ///
    /// # Errors
    /// `NoRobots` for an empty list, `DuplicateLabel` if two robots share a
    /// label.
    pub fn new(
        definitions: Vec<RobotDefinition>,
        tunables: &Tunables,
        resume_mode: ResumeMode,
        rng: Arc<dyn Draw>,
        clock: Arc<dyn Clock>,
    ) -> SimResult<Self> {
        if definitions.is_empty() {
            return Err(SimError::NoRobots);
        }

        let now = clock.now();
        let mut index = HashMap::with_capacity(definitions.len());
        let mut robots = Vec::with_capacity(definitions.len());
        for (i, def) in definitions.into_iter().enumerate() {
            if index.insert(def.label.clone(), i).is_some() {
                return Err(SimError::DuplicateLabel(def.label));
            }
            let state = RobotState::initial(
                &def,
                tunables.default_work_status,
                &tunables.effector_status,
                now,
            );
            robots.push(RobotSlot {
                def,
                state: Mutex::new(state),
            });
        }

        info!(
            "Supervisor ready: {} robots, resume mode {:?}",
            robots.len(),
            resume_mode
        );

        Ok(Self {
            robots,
            index,
            params: SimParams::new(tunables, resume_mode),
            rng,
            clock,
        })
    }

    fn slot(&self, label: &str) -> Option<&RobotSlot> {
        self.index.get(label).map(|&i| &self.robots[i])
    }

    /// Recompute a locked robot at `now` and commit the result.
    fn settle(&self, def: &RobotDefinition, state: &mut RobotState, now: f64) -> Transition {
        let (next, transition) = recompute(state, def, &self.params, self.rng.as_ref(), now);
        *state = next;
        log_transition(&def.label, &transition);
        transition
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Halt the named robots.
    ///
    /// Returns the labels actually changed, in request order. Unknown labels
    /// and robots already halted are skipped.
    pub fn stop<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut changed = Vec::new();
        for label in labels.iter().map(|l| l.as_ref()) {
            let Some(slot) = self.slot(label) else {
                debug!("stop: unknown robot '{}'", label);
                continue;
            };
            let mut state = slot.state.lock();
            if !state.work_status {
                continue;
            }
            let now = self.clock.now();
            state.halt(now);
            self.settle(&slot.def, &mut state, now);
            info!("Robot {} stopped", label);
            changed.push(label.to_string());
        }
        changed
    }

    /// Halt every robot.
    pub fn stop_all(&self) -> Vec<String> {
        self.stop(self.list().as_slice())
    }

    /// Set the named halted robots running again.
    ///
    /// Resuming acts as an operator reset: an active alarm is dropped and
    /// the detector runs again on the resumed pose. Returns the labels
    /// actually changed.
    pub fn resume<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut changed = Vec::new();
        for label in labels.iter().map(|l| l.as_ref()) {
            let Some(slot) = self.slot(label) else {
                debug!("resume: unknown robot '{}'", label);
                continue;
            };
            let mut state = slot.state.lock();
            if state.work_status {
                continue;
            }
            if state.is_faulted() {
                info!("Robot {} alarm {:#04x} reset by resume", label, state.alarm);
                state.alarm = ALARM_NONE;
                state.alarm_timer = 0.0;
            }
            let now = self.clock.now();
            state.resume(self.params.resume_mode, now);
            self.settle(&slot.def, &mut state, now);
            info!("Robot {} resumed", label);
            changed.push(label.to_string());
        }
        changed
    }

    /// Resume every halted robot, resetting any active alarm.
    pub fn resume_all(&self) -> Vec<String> {
        self.resume(self.list().as_slice())
    }

    /// Recompute one robot and return its stringified pose.
    pub fn query_pose(&self, label: &str) -> Option<String> {
        let slot = self.slot(label)?;
        let mut state = slot.state.lock();
        let now = self.clock.now();
        self.settle(&slot.def, &mut state, now);
        Some(state.pose.to_string())
    }

    /// All labels in registration order.
    pub fn list(&self) -> Vec<String> {
        self.robots.iter().map(|s| s.def.label.clone()).collect()
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// Current outward fields, without recomputing.
    pub fn snapshot(&self, label: &str) -> Option<RobotSnapshot> {
        self.slot(label)
            .map(|slot| slot.state.lock().snapshot(&slot.def.label))
    }

    /// Copy of a robot's full state, without recomputing.
    pub fn state(&self, label: &str) -> Option<RobotState> {
        self.slot(label).map(|slot| slot.state.lock().clone())
    }

    pub fn definition(&self, label: &str) -> Option<&RobotDefinition> {
        self.slot(label).map(|slot| &slot.def)
    }

    /// Static identity records, in registration order.
    pub fn identities(&self) -> Vec<RobotIdentity> {
        self.robots.iter().map(|s| s.def.identity()).collect()
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    /// Check every robot's structural invariants.
    pub fn check_invariants(&self) -> Result<(), String> {
        for slot in &self.robots {
            slot.state
                .lock()
                .check_invariants(&slot.def)
                .map_err(|e| format!("{}: {}", slot.def.label, e))?;
        }
        Ok(())
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Publish every robot's identity.
    pub fn register(&self, publisher: &dyn Publisher) -> Result<(), PublishError> {
        for identity in self.identities() {
            publisher.register(&identity)?;
        }
        Ok(())
    }

    /// Recompute every robot, one lock at a time.
    pub fn recompute_all(&self) -> Vec<RobotSnapshot> {
        self.robots
            .iter()
            .map(|slot| {
                let mut state = slot.state.lock();
                let now = self.clock.now();
                self.settle(&slot.def, &mut state, now);
                state.snapshot(&slot.def.label)
            })
            .collect()
    }

    /// One refresh cycle: recompute everything, then publish.
    ///
    /// Publish failures are logged and skipped. Returns the number of
    /// snapshots published.
    pub fn tick(&self, publisher: &dyn Publisher) -> usize {
        let snapshots = self.recompute_all();
        publish_snapshots(publisher, &snapshots)
    }

    /// Tick forever at `period`.
    ///
    /// Publishers may block on I/O, so the publish half of each cycle runs
    /// on the blocking pool and the next cycle waits for it.
    pub async fn run(self: Arc<Self>, publisher: Arc<dyn Publisher>, period: Duration) {
        info!("Refresh loop started, period {:?}", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let snapshots = self.recompute_all();
            let publisher = Arc::clone(&publisher);
            let published =
                task::spawn_blocking(move || publish_snapshots(publisher.as_ref(), &snapshots))
                    .await;
            if let Err(e) = published {
                warn!("Publish task failed: {}", e);
            }
        }
    }
}

/// Publish a batch of snapshots, then flush once.
///
/// Failures are logged and skipped. Returns the number published.
pub fn publish_snapshots(publisher: &dyn Publisher, snapshots: &[RobotSnapshot]) -> usize {
    let mut published = 0;
    for snapshot in snapshots {
        match publisher.publish(snapshot) {
            Ok(()) => published += 1,
            Err(e) => warn!("Publish failed for robot {}: {}", snapshot.label, e),
        }
    }
    if let Err(e) = publisher.flush() {
        warn!("Publisher flush failed: {}", e);
    }
    trace!("Published {}/{} robots", published, snapshots.len());
    published
}

fn log_transition(label: &str, transition: &Transition) {
    match *transition {
        Transition::Held => trace!("Robot {} halted, unchanged", label),
        Transition::Faulted { code, alarm_age_s } => {
            debug!("Robot {} alarm {:#04x} active for {:.1}s", label, code, alarm_age_s)
        }
        Transition::Advanced { index, cleared } => {
            if let Some(code) = cleared {
                info!("Robot {} alarm {:#04x} cleared, running", label, code);
            }
            trace!("Robot {} at sample {}", label, index);
        }
        Transition::AlarmRaised {
            code,
            index,
            cleared,
        } => {
            if let Some(old) = cleared {
                info!("Robot {} alarm {:#04x} cleared, running", label, old);
            }
            warn!(
                "Robot {} raised alarm {:#04x} at sample {}, halted",
                label, code, index
            );
        }
    }
}
