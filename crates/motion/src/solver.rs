//! Per-axis iterative solver: walks a trapq's active segments and
//! turns the continuous position function into discrete step-edge times.
//!
//! The solver only ever produces print-times in seconds (`f64`);
//! seconds-to-microseconds conversion happens in exactly one place,
//! downstream of this module, when a produced edge time is handed to
//! the stepper driver.

use crate::trapq::{MoveSegment, Trapq};

/// Receives step edges produced by the solver. Implemented by the
/// firmware's stepper-driver glue; a `heapless::Vec`-backed sink is used
/// in tests.
pub trait StepSink {
    fn emit_step(&mut self, axis: usize, time_s: f64, dir: i8);
}

const MAX_ITERATIONS: u32 = 50;
const TOLERANCE: f64 = 1e-9;

/// Per-axis solver state. One instance per stepper axis (X, Y, Z, E),
/// drawn from the stepper-kinematics pool.
#[derive(Debug, Clone, Copy)]
pub struct AxisSolver {
    pub axis: usize,
    pub steps_per_mm: f64,
    cursor: f64,
}

impl AxisSolver {
    pub fn new(axis: usize, steps_per_mm: f64, start_time: f64) -> Self {
        Self {
            axis,
            steps_per_mm,
            cursor: start_time,
        }
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    fn projected(&self, seg: &MoveSegment, t: f64) -> f64 {
        seg.position_at(t)[self.axis] * self.steps_per_mm
    }

    fn velocity(&self, seg: &MoveSegment, t: f64) -> f64 {
        let dt = (t - seg.start_time).clamp(0.0, seg.duration());
        let v = if dt <= seg.accel_t {
            seg.start_v + 2.0 * seg.half_accel * dt
        } else if dt <= seg.accel_t + seg.cruise_t {
            seg.cruise_v
        } else {
            let dd = dt - seg.accel_t - seg.cruise_t;
            seg.cruise_v + 2.0 * seg.half_decel * dd
        };
        v * seg.unit_dir[self.axis] * self.steps_per_mm
    }

    /// Bisection bracketed by `[lo, hi]`, refined by Newton-Raphson.
    /// Falls back to pure bisection whenever the local derivative is
    /// too small to trust. Hard-capped at `MAX_ITERATIONS`.
    fn find_step_time(&self, seg: &MoveSegment, mut lo: f64, mut hi: f64, target: f64) -> f64 {
        let mut flo = self.projected(seg, lo) - target;
        let mut fhi = self.projected(seg, hi) - target;
        if flo.abs() < TOLERANCE {
            return lo;
        }
        if fhi.abs() < TOLERANCE {
            return hi;
        }
        let mut t = 0.5 * (lo + hi);
        for _ in 0..MAX_ITERATIONS {
            let f = self.projected(seg, t) - target;
            if f.abs() < TOLERANCE {
                return t;
            }
            if (flo < 0.0) == (f < 0.0) {
                lo = t;
                flo = f;
            } else {
                hi = t;
                fhi = f;
            }
            let deriv = self.velocity(seg, t);
            let mut next = t;
            if deriv.abs() > 1e-6 {
                next = t - f / deriv;
            }
            if next <= lo || next >= hi || deriv.abs() <= 1e-6 {
                next = 0.5 * (lo + hi);
            }
            t = next;
        }
        t
    }

    /// Drives this axis's solver forward from its last flush point up to
    /// `flush_time`, emitting every step edge implied by the trapq's
    /// active segments in that window.
    pub fn drive<const CAP: usize>(
        &mut self,
        trapq: &Trapq<CAP>,
        flush_time: f64,
        sink: &mut impl StepSink,
    ) {
        loop {
            let Some(seg) = trapq.segment_at(self.cursor).or_else(|| {
                trapq
                    .first_active()
                    .filter(|s| s.start_time >= self.cursor)
            }) else {
                break;
            };
            if seg.start_time > flush_time {
                break;
            }
            let window_end = flush_time.min(seg.end_time());
            self.drive_segment(seg, window_end, sink);
            if window_end >= seg.end_time() - 1e-12 {
                self.cursor = seg.end_time();
                if flush_time <= self.cursor {
                    break;
                }
                // Continue the outer loop: next_active relies on a
                // borrow of `seg`, so re-fetch after the move above.
                if trapq.next_active(seg).is_none() {
                    break;
                }
            } else {
                self.cursor = window_end;
                break;
            }
        }
    }

    fn drive_segment(&mut self, seg: &MoveSegment, window_end: f64, sink: &mut impl StepSink) {
        let start_proj = self.projected(seg, self.cursor);
        let end_proj = self.projected(seg, window_end);
        if (end_proj - start_proj).abs() < TOLERANCE {
            // Edge case: no net motion projected on this axis in this
            // window (e.g. the move doesn't touch this axis at all).
            return;
        }
        let sign: i8 = if end_proj > start_proj { 1 } else { -1 };
        let mut t_lo = self.cursor;
        let mut step_pos = start_proj;
        loop {
            let target = step_pos.floor() + sign as f64;
            let reached = if sign > 0 {
                target <= end_proj
            } else {
                target >= end_proj
            };
            if !reached {
                break;
            }
            let t_star = self.find_step_time(seg, t_lo, window_end, target);
            sink.emit_step(self.axis, t_star, sign);
            step_pos = target;
            t_lo = t_star;
        }
    }
}
