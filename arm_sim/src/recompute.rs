//! State recomputation.
//!
//! `recompute` is the pure transition applied to a robot on every tick and
//! every command that needs a settled state. It reads the clock value and
//! the random source it is given and touches nothing but the returned
//! state. Diagnostics are reported through the returned [`Transition`].

use crate::alarm::{AlarmDetector, Draw};
use crate::robot::{RobotDefinition, RobotState};
use arm_common::config::ResumeMode;
use arm_common::consts::ALARM_NONE;
use arm_common::tunables::Tunables;
use arm_common::types::EffectorStatus;

/// Parameters shared by every recomputation.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub detector: AlarmDetector,
    /// Minimum alarm age before a clearing draw is taken
    pub alarm_cleared_s: f64,
    /// Clearing draws succeed with probability `1 / alarms_range`
    pub alarms_range: u32,
    pub resume_mode: ResumeMode,
}

impl SimParams {
    pub fn new(tunables: &Tunables, resume_mode: ResumeMode) -> Self {
        Self {
            detector: AlarmDetector::new(tunables.probability_range),
            alarm_cleared_s: tunables.alarm_cleared_s,
            alarms_range: tunables.alarms_range.max(1),
            resume_mode,
        }
    }
}

/// What a recomputation did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Halted without alarm; state unchanged.
    Held,
    /// Alarm still active; state frozen.
    Faulted { code: u16, alarm_age_s: f64 },
    /// Running; pose taken from sample `index`. `cleared` holds the alarm
    /// code if this call cleared one first.
    Advanced { index: usize, cleared: Option<u16> },
    /// Running, then an alarm fired on the new pose and the robot halted.
    AlarmRaised {
        code: u16,
        index: usize,
        cleared: Option<u16>,
    },
}

/// Derive the next state of a robot at time `now` (seconds).
pub fn recompute(
    state: &RobotState,
    def: &RobotDefinition,
    params: &SimParams,
    rng: &dyn Draw,
    now: f64,
) -> (RobotState, Transition) {
    let mut next = state.clone();
    let mut cleared = None;

    if next.is_faulted() {
        let alarm_age_s = now - next.alarm_timer;
        let range = u64::from(params.alarms_range);
        if alarm_age_s > params.alarm_cleared_s && rng.uniform(range) == range {
            cleared = Some(next.alarm);
            next.alarm = ALARM_NONE;
            next.alarm_timer = 0.0;
            next.resume(params.resume_mode, now);
        } else {
            next.work_status = false;
            let code = next.alarm;
            return (next, Transition::Faulted { code, alarm_age_s });
        }
    }

    if !next.work_status {
        return (next, Transition::Held);
    }

    let program = def.program();
    next.runtime_s = program.wrap_runtime(now - next.start_reference);
    let index = program.index_at(next.runtime_s);
    let sample = &program.samples()[index];

    let caps = def.capabilities;
    next.pose = sample.pose;
    next.laser = EffectorStatus::sampled(caps.laser, sample.laser);
    next.suction_cup = EffectorStatus::sampled(caps.suction_cup, sample.suction_cup);
    next.gripper = EffectorStatus::sampled(caps.gripper, sample.gripper);

    match params.detector.detect(&next.pose, rng, now) {
        Some(alarm) => {
            next.alarm = alarm.code;
            next.alarm_timer = alarm.raised_at;
            next.halt(now);
            (
                next,
                Transition::AlarmRaised {
                    code: alarm.code,
                    index,
                    cleared,
                },
            )
        }
        None => {
            next.alarm_timer = 0.0;
            (next, Transition::Advanced { index, cleared })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{FixedDraw, ScriptedDraw};
    use crate::program::MotionProgram;
    use arm_common::config::RobotConfig;
    use arm_common::consts::{ALARM_JOINT_LIMIT, ALARM_MOTION_LIMIT};
    use std::sync::Arc;

    /// Lands on 5: misses limit draws whose range exceeds 5 and every
    /// step-loss draw. With a range of 1 it clamps to 1 and fires.
    const QUIET: FixedDraw = FixedDraw(5);

    /// Four samples, 10 s cycle; sample 2 has joint 0 out of band.
    fn definition() -> RobotDefinition {
        let text = "pose\tjoints\tlaser\tsuction\tgripper\n\
            [100, 0, 0, 0]\t[0, 10, 10, 0]\t0\t1\t0\n\
            [110, 0, 0, 0]\t[1, 10, 10, 0]\t1\t1\t0\n\
            [120, 0, 0, 0]\t[89, 10, 10, 0]\t0\t0\t1\n\
            [130, 0, 0, 0]\t[3, 10, 10, 0]\t1\t0\t1\n";
        let program = Arc::new(MotionProgram::parse(1, text, 10.0).unwrap());
        let config = RobotConfig {
            label: "r1".to_string(),
            serial_number: "SN".to_string(),
            id: 1,
            name: "r1".to_string(),
            program: 1,
            version: "1".to_string(),
            laser: true,
            suction_cup: false,
            gripper: true,
        };
        RobotDefinition::new(&config, program)
    }

    fn params(probability_range: u32, alarms_range: u32) -> SimParams {
        let tunables = Tunables {
            probability_range,
            alarm_cleared_s: 900.0,
            alarms_range,
            ..Tunables::default()
        };
        SimParams::new(&tunables, ResumeMode::Skip)
    }

    fn running(def: &RobotDefinition) -> RobotState {
        RobotState::initial(def, true, "False", 1000.0)
    }

    #[test]
    fn test_running_follows_index_law() {
        let def = definition();
        let p = params(10_000, 20);
        let state = running(&def);
        for (elapsed, expected) in [(0.0, 0), (2.4, 0), (2.5, 1), (9.99, 3), (13.0, 1)] {
            let (next, t) = recompute(&state, &def, &p, &QUIET, 1000.0 + elapsed);
            assert_eq!(
                t,
                Transition::Advanced {
                    index: expected,
                    cleared: None
                }
            );
            assert_eq!(next.pose, def.program().samples()[expected].pose);
            assert!(next.check_invariants(&def).is_ok());
        }
    }

    #[test]
    fn test_effectors_follow_capabilities() {
        let def = definition();
        let (next, _) = recompute(&running(&def), &def, &params(10_000, 20), &QUIET, 1002.5);
        assert_eq!(next.laser.to_string(), "[true, 1]");
        assert_eq!(next.suction_cup.to_string(), "[false]");
        assert_eq!(next.gripper.to_string(), "[true, 0]");
    }

    #[test]
    fn test_wrap_at_exact_duration() {
        let def = definition();
        let p = params(10_000, 20);
        let state = running(&def);
        let (at_zero, _) = recompute(&state, &def, &p, &QUIET, 1000.0);
        let (at_end, t) = recompute(&state, &def, &p, &QUIET, 1010.0);
        assert_eq!(at_end.pose, at_zero.pose);
        assert_eq!(at_end.runtime_s, 0.0);
        assert!(matches!(t, Transition::Advanced { index: 0, .. }));
    }

    #[test]
    fn test_halted_state_unchanged() {
        let def = definition();
        let mut state = running(&def);
        state.halt(1001.0);
        let (next, t) = recompute(&state, &def, &params(1, 1), &FixedDraw(1), 1500.0);
        assert_eq!(t, Transition::Held);
        assert_eq!(next, state);
    }

    #[test]
    fn test_out_of_band_alarm_halts_at_fault_pose() {
        let def = definition();
        // probability range 1: every out-of-band evaluation fires
        let (next, t) = recompute(&running(&def), &def, &params(1, 20), &QUIET, 1005.0);
        assert_eq!(
            t,
            Transition::AlarmRaised {
                code: ALARM_JOINT_LIMIT,
                index: 2,
                cleared: None
            }
        );
        assert_eq!(next.alarm, ALARM_JOINT_LIMIT);
        assert_eq!(next.alarm_timer, 1005.0);
        assert!(!next.work_status);
        assert_eq!(next.pose, def.program().samples()[2].pose);
        assert_eq!(next.halted_at, Some(1005.0));
        assert!(next.check_invariants(&def).is_ok());
    }

    #[test]
    fn test_faulted_robot_frozen_until_cleared() {
        let def = definition();
        let p = params(1, 1);
        let (faulted, _) = recompute(&running(&def), &def, &p, &QUIET, 1005.0);

        // before ALARM_CLEARED elapses nothing moves, even with a winning draw
        for now in [1006.0, 1500.0, 1905.0] {
            let (next, t) = recompute(&faulted, &def, &p, &FixedDraw(u64::MAX), now);
            assert!(matches!(t, Transition::Faulted { code: ALARM_JOINT_LIMIT, .. }));
            assert_eq!(next, faulted);
        }
    }

    #[test]
    fn test_clearing_requires_winning_draw() {
        let def = definition();
        let p = params(10_000, 20);
        let mut faulted = running(&def);
        faulted.alarm = ALARM_MOTION_LIMIT;
        faulted.alarm_timer = 1000.0;
        faulted.halt(1000.0);

        // eligible, but the clearing draw misses
        let (next, t) = recompute(&faulted, &def, &p, &FixedDraw(19), 2000.0);
        assert!(matches!(t, Transition::Faulted { alarm_age_s, .. } if alarm_age_s == 1000.0));
        assert_eq!(next, faulted);
    }

    #[test]
    fn test_alarms_range_one_clears_on_first_eligible_tick() {
        let def = definition();
        let p = params(10_000, 1);
        let mut faulted = running(&def);
        faulted.alarm = ALARM_MOTION_LIMIT;
        faulted.alarm_timer = 1000.0;
        faulted.halt(1000.0);

        // clearing draw (range 1) then a quiet step-loss sequence
        let rng = ScriptedDraw::new([1, 5, 5, 5, 5], 5);
        let (next, t) = recompute(&faulted, &def, &p, &rng, 1900.5);
        assert_eq!(
            t,
            Transition::Advanced {
                index: 0,
                cleared: Some(ALARM_MOTION_LIMIT)
            }
        );
        assert_eq!(next.alarm, 0);
        assert!(next.work_status);
        assert_eq!(next.halted_at, None);
        assert!(next.check_invariants(&def).is_ok());
    }

    #[test]
    fn test_exactly_alarm_cleared_is_not_eligible() {
        let def = definition();
        let p = params(10_000, 1);
        let mut faulted = running(&def);
        faulted.alarm = ALARM_MOTION_LIMIT;
        faulted.alarm_timer = 1000.0;
        faulted.halt(1000.0);
        let (_, t) = recompute(&faulted, &def, &p, &QUIET, 1900.0);
        assert!(matches!(t, Transition::Faulted { .. }));
    }

    #[test]
    fn test_in_place_clear_continues_from_fault_sample() {
        let def = definition();
        let tunables = Tunables {
            probability_range: 10_000,
            alarm_cleared_s: 0.0,
            alarms_range: 1,
            ..Tunables::default()
        };
        let p = SimParams::new(&tunables, ResumeMode::InPlace);

        let mut state = running(&def);
        // advance to sample 1, then fault there
        let (at_one, _) = recompute(&state, &def, &p, &QUIET, 1003.0);
        state = at_one;
        state.alarm = ALARM_MOTION_LIMIT;
        state.alarm_timer = 1003.0;
        state.halt(1003.0);

        // 100 s later the alarm clears and the cycle picks up at 3 s again
        let (next, t) = recompute(&state, &def, &p, &QUIET, 1103.0);
        assert!(matches!(t, Transition::Advanced { index: 1, cleared: Some(_) }));
        assert!((next.runtime_s - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_recompute_does_not_touch_input() {
        let def = definition();
        let state = running(&def);
        let before = state.clone();
        let _ = recompute(&state, &def, &params(1, 1), &FixedDraw(1), 1005.0);
        assert_eq!(state, before);
    }
}
