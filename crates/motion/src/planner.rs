//! Motion planner / toolhead core: move admission, lookahead with
//! junction-velocity capping, and segment commit into the trapq. Also
//! carries the vocabulary for the homing episode state machine; the
//! actual endstop polling and timeout bookkeeping live with the hardware
//! glue upstream of this crate, since this crate has no notion of real
//! time or real GPIOs.

use crate::error::PlannerError;
use crate::solver::{AxisSolver, StepSink};
use crate::trapq::Trapq;

#[cfg(not(feature = "std"))]
use libm::sqrt;
#[cfg(feature = "std")]
fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

/// Per-axis static configuration: scale and (optional) soft travel limits.
/// The extruder axis (index 3) has no soft limits, matching its
/// data model ("E has no soft limits").
#[derive(Debug, Clone, Copy)]
pub struct AxisConfig {
    pub steps_per_mm: f64,
    pub soft_min: Option<f64>,
    pub soft_max: Option<f64>,
}

impl AxisConfig {
    pub const fn unlimited(steps_per_mm: f64) -> Self {
        Self {
            steps_per_mm,
            soft_min: None,
            soft_max: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToolheadConfig {
    pub axes: [AxisConfig; 4],
    pub max_velocity: f64,
    pub max_accel: f64,
    pub max_accel_to_decel: f64,
    pub square_corner_velocity: f64,
}

/// A move awaiting velocity resolution in the lookahead ring.
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    start_pos: [f64; 4],
    unit_dir: [f64; 4],
    distance: f64,
    max_v: f64,
    backward_cap: f64,
    entry_v: f64,
    cruise_v: f64,
    exit_v: f64,
}

/// The homing episode's state machine, per spec §4.6: `Idle -> Fast ->
/// Retract -> Done` on success, any step may go to `Error` on timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingState {
    Idle,
    Fast,
    Retract,
    Done,
    Error,
}

fn euclidean4d(a: [f64; 4], b: [f64; 4]) -> f64 {
    let mut sum = 0.0;
    for i in 0..4 {
        let d = b[i] - a[i];
        sum += d * d;
    }
    sqrt(sum)
}

/// `c = u . v` for two 4D unit direction vectors.
fn dot(u: [f64; 4], v: [f64; 4]) -> f64 {
    let mut s = 0.0;
    for i in 0..4 {
        s += u[i] * v[i];
    }
    s
}

/// Junction velocity between two consecutive unit directions, per the
/// spec's corner formula. `provisional_cap` is the smaller of the two
/// adjoining moves' clamped feedrates.
fn junction_velocity(
    prev_dir: [f64; 4],
    dir: [f64; 4],
    max_accel: f64,
    square_corner_velocity: f64,
    provisional_cap: f64,
) -> f64 {
    let c = dot(prev_dir, dir).clamp(-1.0, 1.0);
    if c < -0.999 {
        return 0.0;
    }
    if c > 0.999 {
        return provisional_cap;
    }
    let sin_half = sqrt((1.0 - c) / 2.0);
    let delta = square_corner_velocity * square_corner_velocity / max_accel;
    let v = sqrt(max_accel * delta / sin_half);
    v.min(provisional_cap)
}

/// Motion planner and toolhead state, generic over the lookahead ring
/// capacity `L` and the trapq's move-pool capacity `CAP`.
pub struct Toolhead<const L: usize, const CAP: usize> {
    config: ToolheadConfig,
    commanded_pos: [f64; 4],
    print_time: f64,
    lookahead: heapless::Vec<PendingMove, L>,
    last_exit_v: f64,
    last_dir: Option<[f64; 4]>,
    trapq: Trapq<CAP>,
    solvers: [AxisSolver; 4],
    relaxed_limits: bool,
    pub homing: HomingState,
}

impl<const L: usize, const CAP: usize> Toolhead<L, CAP> {
    pub fn new(config: ToolheadConfig) -> Self {
        let solvers = [
            AxisSolver::new(0, config.axes[0].steps_per_mm, 0.0),
            AxisSolver::new(1, config.axes[1].steps_per_mm, 0.0),
            AxisSolver::new(2, config.axes[2].steps_per_mm, 0.0),
            AxisSolver::new(3, config.axes[3].steps_per_mm, 0.0),
        ];
        Self {
            config,
            commanded_pos: [0.0; 4],
            print_time: 0.0,
            lookahead: heapless::Vec::new(),
            last_exit_v: 0.0,
            last_dir: None,
            trapq: Trapq::new(),
            solvers,
            relaxed_limits: false,
            homing: HomingState::Idle,
        }
    }

    pub fn commanded_position(&self) -> [f64; 4] {
        self.commanded_pos
    }

    pub fn print_time(&self) -> f64 {
        self.print_time
    }

    pub fn last_exit_velocity(&self) -> f64 {
        self.last_exit_v
    }

    /// R1: exact componentwise set/get.
    pub fn set_position(&mut self, pos: [f64; 4]) {
        self.commanded_pos = pos;
    }

    pub fn relax_soft_limits(&mut self) {
        self.relaxed_limits = true;
    }

    pub fn restore_soft_limits(&mut self) {
        self.relaxed_limits = false;
    }

    fn within_soft_limits(&self, pos: [f64; 4]) -> bool {
        if self.relaxed_limits {
            return true;
        }
        for i in 0..4 {
            let axis = &self.config.axes[i];
            if let Some(min) = axis.soft_min {
                if pos[i] < min {
                    return false;
                }
            }
            if let Some(max) = axis.soft_max {
                if pos[i] > max {
                    return false;
                }
            }
        }
        true
    }

    /// Admits one move request. Moves below the `1e-6` mm distance
    /// threshold are silently accepted as no-ops. A full lookahead ring
    /// triggers one flush-and-retry before failing with `QueueFull`.
    pub fn queue_move(
        &mut self,
        end_pos: [f64; 4],
        feedrate_mm_s: f64,
        sink: &mut impl StepSink,
    ) -> Result<(), PlannerError> {
        let distance = euclidean4d(self.commanded_pos, end_pos);
        if distance < 1e-6 {
            return Ok(());
        }
        if !self.within_soft_limits(end_pos) {
            return Err(PlannerError::OutOfBounds);
        }
        let max_v = feedrate_mm_s.min(self.config.max_velocity);
        let mut unit_dir = [0.0; 4];
        for i in 0..4 {
            unit_dir[i] = (end_pos[i] - self.commanded_pos[i]) / distance;
        }
        if self.lookahead.len() + 2 > L {
            self.flush(sink)?;
        }
        let pm = PendingMove {
            start_pos: self.commanded_pos,
            unit_dir,
            distance,
            max_v,
            backward_cap: max_v,
            entry_v: 0.0,
            cruise_v: 0.0,
            exit_v: 0.0,
        };
        self.lookahead.push(pm).map_err(|_| PlannerError::QueueFull)?;
        self.commanded_pos = end_pos;
        if self.lookahead.len() + 2 >= L {
            self.flush(sink)?;
        }
        Ok(())
    }

    /// Runs the backward/forward lookahead sweep over every move
    /// currently in the ring, commits each to the trapq, and drains the
    /// ring. Safe to call with an empty ring (no-op).
    pub fn flush(&mut self, sink: &mut impl StepSink) -> Result<(), PlannerError> {
        if self.lookahead.is_empty() {
            return Ok(());
        }
        let n = self.lookahead.len();

        // Backward sweep: assume the queue ends at rest.
        let mut successor_v = 0.0_f64;
        for i in (0..n).rev() {
            let d = self.lookahead[i].distance;
            let decel_bound = sqrt(successor_v * successor_v + 2.0 * self.config.max_accel * d);
            let prev_dir = if i == 0 {
                self.last_dir
            } else {
                Some(self.lookahead[i - 1].unit_dir)
            };
            let junction_cap = match prev_dir {
                None => f64::INFINITY,
                Some(pd) => junction_velocity(
                    pd,
                    self.lookahead[i].unit_dir,
                    self.config.max_accel,
                    self.config.square_corner_velocity,
                    self.lookahead[i].max_v,
                ),
            };
            let cap = decel_bound.min(junction_cap).min(self.lookahead[i].max_v);
            self.lookahead[i].backward_cap = cap;
            successor_v = cap;
        }

        // Forward sweep.
        let mut prev_exit = self.last_exit_v;
        for i in 0..n {
            let d = self.lookahead[i].distance;
            let entry_v = prev_exit.min(self.lookahead[i].backward_cap);
            let cruise_feasible = sqrt(entry_v * entry_v + 2.0 * self.config.max_accel * d);
            let cruise_v = cruise_feasible
                .min(self.lookahead[i].max_v)
                .min(self.lookahead[i].backward_cap);
            let exit_feasible_sq = cruise_v * cruise_v - 2.0 * self.config.max_accel_to_decel * d;
            let exit_feasible = if exit_feasible_sq > 0.0 {
                sqrt(exit_feasible_sq)
            } else {
                0.0
            };
            let exit_v = exit_feasible.min(self.lookahead[i].backward_cap);

            self.lookahead[i].entry_v = entry_v;
            self.lookahead[i].cruise_v = cruise_v;
            self.lookahead[i].exit_v = exit_v;
            prev_exit = exit_v;
        }

        for i in 0..n {
            let pm = self.lookahead[i];
            self.commit_segment(pm, sink)?;
        }
        self.last_dir = Some(self.lookahead[n - 1].unit_dir);
        self.last_exit_v = self.lookahead[n - 1].exit_v;
        self.lookahead.clear();
        Ok(())
    }

    fn commit_segment(
        &mut self,
        pm: PendingMove,
        sink: &mut impl StepSink,
    ) -> Result<(), PlannerError> {
        let a = self.config.max_accel;
        let ad = self.config.max_accel_to_decel;
        let d = pm.distance;
        let entry = pm.entry_v;
        let exit = pm.exit_v;
        let mut cruise = pm.cruise_v;

        let mut accel_t = if cruise > entry { (cruise - entry) / a } else { 0.0 };
        let mut decel_t = if cruise > exit { (cruise - exit) / ad } else { 0.0 };
        let mut accel_dist = entry * accel_t + 0.5 * a * accel_t * accel_t;
        let mut decel_dist = cruise * decel_t - 0.5 * ad * decel_t * decel_t;

        let cruise_t;
        if accel_dist + decel_dist > d {
            let peak_sq = 0.5 * (entry * entry + exit * exit) + a * d;
            let peak = sqrt(peak_sq.max(0.0)).max(entry).max(exit);
            cruise = peak;
            accel_t = if cruise > entry { (cruise - entry) / a } else { 0.0 };
            decel_t = if cruise > exit { (cruise - exit) / ad } else { 0.0 };
            accel_dist = entry * accel_t + 0.5 * a * accel_t * accel_t;
            decel_dist = cruise * decel_t - 0.5 * ad * decel_t * decel_t;
            cruise_t = 0.0;
            let _ = (accel_dist, decel_dist);
        } else {
            let denom = cruise.max(1e-9);
            let t = (d - accel_dist - decel_dist) / denom;
            cruise_t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        }

        let start_time = self.print_time;
        self.trapq.append(
            start_time,
            accel_t,
            cruise_t,
            decel_t,
            pm.start_pos,
            pm.unit_dir,
            entry,
            cruise,
            a,
            ad,
        )?;
        self.print_time = start_time + accel_t + cruise_t + decel_t;

        for solver in self.solvers.iter_mut() {
            solver.drive(&self.trapq, self.print_time, sink);
        }
        Ok(())
    }

    /// Drops trapq history older than the retention margin; call
    /// periodically from the main loop, not from the hot commit path.
    pub fn reap_history(&mut self, before_time: f64) {
        self.trapq.finalize_before(self.print_time);
        self.trapq.free_before(before_time);
    }

    pub fn position_at(&self, t: f64) -> Option<[f64; 4]> {
        self.trapq.position_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;
    impl StepSink for NullSink {
        fn emit_step(&mut self, _axis: usize, _time_s: f64, _dir: i8) {}
    }

    fn test_config() -> ToolheadConfig {
        ToolheadConfig {
            axes: [
                AxisConfig {
                    steps_per_mm: 80.0,
                    soft_min: Some(0.0),
                    soft_max: Some(300.0),
                },
                AxisConfig {
                    steps_per_mm: 80.0,
                    soft_min: Some(0.0),
                    soft_max: Some(300.0),
                },
                AxisConfig {
                    steps_per_mm: 400.0,
                    soft_min: Some(0.0),
                    soft_max: Some(300.0),
                },
                AxisConfig::unlimited(400.0),
            ],
            max_velocity: 300.0,
            max_accel: 3000.0,
            max_accel_to_decel: 3000.0,
            square_corner_velocity: 5.0,
        }
    }

    #[test]
    fn single_axis_move_runs_at_constant_feedrate() {
        let mut th: Toolhead<16, 32> = Toolhead::new(test_config());
        let mut sink = NullSink;
        th.queue_move([10.0, 0.0, 0.0, 0.0], 10.0, &mut sink)
            .unwrap();
        th.flush(&mut sink).unwrap();
        assert_eq!(th.commanded_position(), [10.0, 0.0, 0.0, 0.0]);
        assert_eq!(th.last_exit_velocity(), 0.0);
    }

    #[test]
    fn collinear_moves_reach_common_cruise_at_junction() {
        let mut th: Toolhead<16, 32> = Toolhead::new(test_config());
        let mut sink = NullSink;
        th.queue_move([10.0, 0.0, 0.0, 0.0], 100.0, &mut sink)
            .unwrap();
        th.queue_move([20.0, 0.0, 0.0, 0.0], 100.0, &mut sink)
            .unwrap();
        th.flush(&mut sink).unwrap();
        assert!(th.last_exit_velocity() >= 0.0);
        assert_eq!(th.commanded_position(), [20.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn right_angle_corner_is_capped_below_cruise() {
        let expected = junction_velocity(
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            3000.0,
            5.0,
            f64::INFINITY,
        );
        assert!(expected < 100.0);
        assert!(expected > 0.0);
    }

    #[test]
    fn tiny_move_is_a_noop() {
        let mut th: Toolhead<16, 32> = Toolhead::new(test_config());
        let mut sink = NullSink;
        let before = th.commanded_position();
        th.queue_move([1e-7, 0.0, 0.0, 0.0], 100.0, &mut sink)
            .unwrap();
        assert_eq!(th.commanded_position(), before);
    }

    #[test]
    fn out_of_bounds_move_is_rejected() {
        let mut th: Toolhead<16, 32> = Toolhead::new(test_config());
        let mut sink = NullSink;
        let err = th
            .queue_move([1000.0, 0.0, 0.0, 0.0], 100.0, &mut sink)
            .unwrap_err();
        assert_eq!(err, PlannerError::OutOfBounds);
    }

    #[test]
    fn set_position_round_trips_exactly() {
        let mut th: Toolhead<16, 32> = Toolhead::new(test_config());
        th.set_position([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(th.commanded_position(), [1.0, 2.0, 3.0, 4.0]);
    }
}
