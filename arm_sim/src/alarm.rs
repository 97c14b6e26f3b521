//! Alarm detection.
//!
//! Three independent fault sources are evaluated in fixed priority order,
//! stopping at the first that fires:
//!
//! 1. Joint limit (`0x12`): a joint strictly outside its trigger band arms a
//!    `1 / probability_range` draw.
//! 2. Motion limit (`0x21`): same mechanism for the Cartesian coordinates.
//! 3. Step loss (`0x50..=0x53`): four ordered draws from
//!    `[1, 100 × probability_range]`; draw *i* fires when it lands on *i*.
//!
//! Trigger bands are the nominal limits tightened by a fixed margin. A value
//! exactly on the band edge is in-band.

use arm_common::consts::{
    ALARM_JOINT_LIMIT, ALARM_MOTION_LIMIT, ALARM_STEP_LOSS_BASE, COORD_LIMITS,
    COORD_TRIGGER_MARGIN, JOINT_LIMITS, JOINT_TRIGGER_MARGIN, STEP_LOSS_SCALE,
    STEP_LOSS_SOURCES,
};
use arm_common::types::Pose;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

/// Source of uniform integer draws.
///
/// Shared by every robot and called from the tick task and command
/// handlers concurrently.
pub trait Draw: Send + Sync {
    /// Uniform integer in `[1, upper]` (`upper >= 1`).
    fn uniform(&self, upper: u64) -> u64;
}

/// Default source backed by the thread-local `rand` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngDraw;

impl Draw for ThreadRngDraw {
    fn uniform(&self, upper: u64) -> u64 {
        rand::thread_rng().gen_range(1..=upper.max(1))
    }
}

/// Always returns the same value, clamped into `[1, upper]`.
///
/// `FixedDraw(u64::MAX)` always lands on the upper bound (every limit and
/// clearing draw succeeds, step loss never fires); `FixedDraw(1)` always
/// lands on 1.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub u64);

impl Draw for FixedDraw {
    fn uniform(&self, upper: u64) -> u64 {
        self.0.clamp(1, upper.max(1))
    }
}

/// Replays a queue of draws, then falls back to a fixed value.
#[derive(Debug)]
pub struct ScriptedDraw {
    queue: Mutex<VecDeque<u64>>,
    fallback: FixedDraw,
}

impl ScriptedDraw {
    pub fn new(draws: impl IntoIterator<Item = u64>, fallback: u64) -> Self {
        Self {
            queue: Mutex::new(draws.into_iter().collect()),
            fallback: FixedDraw(fallback),
        }
    }

    /// Draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Draw for ScriptedDraw {
    fn uniform(&self, upper: u64) -> u64 {
        match self.queue.lock().pop_front() {
            Some(v) => v.clamp(1, upper.max(1)),
            None => self.fallback.uniform(upper),
        }
    }
}

/// A raised alarm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alarm {
    pub code: u16,
    /// Timestamp (seconds) at which the alarm fired
    pub raised_at: f64,
}

/// Stateless evaluator of the three alarm sources.
#[derive(Debug, Clone, Copy)]
pub struct AlarmDetector {
    probability_range: u64,
}

impl AlarmDetector {
    pub fn new(probability_range: u32) -> Self {
        Self {
            probability_range: u64::from(probability_range.max(1)),
        }
    }

    /// Evaluate a freshly computed pose.
    ///
    /// Returns `None` when nothing fires.
    pub fn detect(&self, pose: &Pose, rng: &dyn Draw, now: f64) -> Option<Alarm> {
        let code = self
            .joint_limit(pose, rng)
            .or_else(|| self.motion_limit(pose, rng))
            .or_else(|| self.step_loss(rng))?;
        Some(Alarm {
            code,
            raised_at: now,
        })
    }

    fn joint_limit(&self, pose: &Pose, rng: &dyn Draw) -> Option<u16> {
        (joints_out_of_band(pose) && self.limit_draw(rng)).then_some(ALARM_JOINT_LIMIT)
    }

    fn motion_limit(&self, pose: &Pose, rng: &dyn Draw) -> Option<u16> {
        (coords_out_of_band(pose) && self.limit_draw(rng)).then_some(ALARM_MOTION_LIMIT)
    }

    fn limit_draw(&self, rng: &dyn Draw) -> bool {
        rng.uniform(self.probability_range) == self.probability_range
    }

    fn step_loss(&self, rng: &dyn Draw) -> Option<u16> {
        let upper = u64::from(STEP_LOSS_SCALE) * self.probability_range;
        (1..=STEP_LOSS_SOURCES)
            .find(|&i| rng.uniform(upper) == u64::from(i))
            .map(|i| ALARM_STEP_LOSS_BASE + i - 1)
    }
}

/// Whether any joint is strictly outside its trigger band.
pub fn joints_out_of_band(pose: &Pose) -> bool {
    out_of_band(&pose.joints, &JOINT_LIMITS, JOINT_TRIGGER_MARGIN)
}

/// Whether any coordinate is strictly outside its trigger band.
pub fn coords_out_of_band(pose: &Pose) -> bool {
    out_of_band(&pose.coords, &COORD_LIMITS, COORD_TRIGGER_MARGIN)
}

fn out_of_band(values: &[f64], limits: &[[f64; 2]], margin: f64) -> bool {
    values
        .iter()
        .zip(limits)
        .any(|(&v, &[lo, hi])| v > hi - margin || v < lo + margin)
}
