//! The trapezoidal queue: an ordered, append-only-at-the-tail list of
//! committed motion segments, each a three-phase (accel/cruise/decel)
//! velocity profile over a 4D (X, Y, Z, E) direction.
//!
//! No heap: segments live in a fixed-capacity arena and are linked by
//! integer handle rather than pointer, exactly the way the timer wheel
//! links timers — a head index plus a per-slot next-index forms the
//! "active" and "history" lists, and a third free-list threads unused
//! slots. This is a fixed-capacity pool instead of `alloc`/`free`.

use crate::error::PlannerError;

const NIL: u16 = u16::MAX;

/// A single committed move segment: a three-phase trapezoidal distance
/// function over a unit-direction 4D vector.
///
/// `half_accel`/`half_decel` are pre-halved so `position_at` can evaluate
/// `s = v0*t + half*t*t` directly in every phase without a runtime divide.
/// The cruise phase has an implicit half-accel of zero.
#[derive(Debug, Clone, Copy)]
pub struct MoveSegment {
    pub start_time: f64,
    pub accel_t: f64,
    pub cruise_t: f64,
    pub decel_t: f64,
    pub start_pos: [f64; 4],
    pub unit_dir: [f64; 4],
    pub start_v: f64,
    pub cruise_v: f64,
    pub half_accel: f64,
    pub half_decel: f64,
}

impl MoveSegment {
    pub fn duration(&self) -> f64 {
        self.accel_t + self.cruise_t + self.decel_t
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Exit velocity implied by the decel phase (`cruise_v + 2*half_decel*decel_t`).
    pub fn exit_velocity(&self) -> f64 {
        self.cruise_v + 2.0 * self.half_decel * self.decel_t
    }

    fn accel_distance(&self) -> f64 {
        self.start_v * self.accel_t + self.half_accel * self.accel_t * self.accel_t
    }

    fn cruise_distance(&self) -> f64 {
        self.cruise_v * self.cruise_t
    }

    /// Scalar arc-length distance travelled at time `t` since this
    /// segment's `start_time`. `t` is clamped into `[0, duration]` so
    /// callers may query slightly stale cursors without special-casing.
    pub fn distance_at(&self, t: f64) -> f64 {
        let dt = t.clamp(0.0, self.duration());
        if dt <= self.accel_t {
            self.start_v * dt + self.half_accel * dt * dt
        } else if dt <= self.accel_t + self.cruise_t {
            let dc = dt - self.accel_t;
            self.accel_distance() + self.cruise_v * dc
        } else {
            let dd = dt - self.accel_t - self.cruise_t;
            self.accel_distance() + self.cruise_distance() + self.cruise_v * dd
                + self.half_decel * dd * dd
        }
    }

    /// Position at absolute print-time `t` (undefined if `t` falls outside
    /// `[start_time, end_time()]`; callers locate the owning segment first).
    pub fn position_at(&self, t: f64) -> [f64; 4] {
        let s = self.distance_at(t - self.start_time);
        let mut p = self.start_pos;
        for i in 0..4 {
            p[i] += self.unit_dir[i] * s;
        }
        p
    }
}

struct Slot {
    seg: MoveSegment,
    next: u16,
}

/// Fixed-capacity arena holding the `active` and `history` intrusive
/// lists. `CAP` is the move-pool capacity (spec's "move pool (>= 32)").
pub struct Trapq<const CAP: usize> {
    slots: [Option<Slot>; CAP],
    active_head: u16,
    active_tail: u16,
    history_head: u16,
    free_head: u16,
}

impl<const CAP: usize> Trapq<CAP> {
    pub fn new() -> Self {
        let mut slots: [Option<Slot>; CAP] = [const { None }; CAP];
        for i in 0..CAP {
            slots[i] = Some(Slot {
                seg: MoveSegment {
                    start_time: 0.0,
                    accel_t: 0.0,
                    cruise_t: 0.0,
                    decel_t: 0.0,
                    start_pos: [0.0; 4],
                    unit_dir: [0.0; 4],
                    start_v: 0.0,
                    cruise_v: 0.0,
                    half_accel: 0.0,
                    half_decel: 0.0,
                },
                next: if i + 1 < CAP { (i + 1) as u16 } else { NIL },
            });
        }
        Self {
            slots,
            active_head: NIL,
            active_tail: NIL,
            history_head: NIL,
            free_head: 0,
        }
    }

    fn claim(&mut self) -> Result<u16, PlannerError> {
        if self.free_head == NIL {
            return Err(PlannerError::PoolExhausted);
        }
        let idx = self.free_head;
        self.free_head = self.slots[idx as usize].as_ref().unwrap().next;
        Ok(idx)
    }

    fn release(&mut self, idx: u16) {
        self.slots[idx as usize].as_mut().unwrap().next = self.free_head;
        self.free_head = idx;
    }

    /// Appends a new segment to the tail of `active`.
    ///
    /// Precondition: when `active` is non-empty, `seg.start_time`
    /// must equal the previous tail's `end_time()`. Debug-asserted; a
    /// release build trusts the caller (the planner), which is the only
    /// producer of segments.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        start_time: f64,
        accel_t: f64,
        cruise_t: f64,
        decel_t: f64,
        start_pos: [f64; 4],
        unit_dir: [f64; 4],
        start_v: f64,
        cruise_v: f64,
        accel: f64,
        decel: f64,
    ) -> Result<(), PlannerError> {
        let seg = MoveSegment {
            start_time,
            accel_t,
            cruise_t,
            decel_t,
            start_pos,
            unit_dir,
            start_v,
            cruise_v,
            half_accel: 0.5 * accel,
            half_decel: -0.5 * decel,
        };
        if let Some(tail) = self.active_tail_seg() {
            debug_assert!((tail.end_time() - start_time).abs() < 1e-6);
        }
        let idx = self.claim()?;
        self.slots[idx as usize].as_mut().unwrap().seg = seg;
        self.slots[idx as usize].as_mut().unwrap().next = NIL;
        if self.active_tail == NIL {
            self.active_head = idx;
        } else {
            self.slots[self.active_tail as usize].as_mut().unwrap().next = idx;
        }
        self.active_tail = idx;
        Ok(())
    }

    fn active_tail_seg(&self) -> Option<&MoveSegment> {
        if self.active_tail == NIL {
            None
        } else {
            Some(&self.slots[self.active_tail as usize].as_ref().unwrap().seg)
        }
    }

    /// Reference to the active segment, if any, covering `t`. Segments are
    /// visited head-to-tail, so this is O(n) in the active-list length,
    /// which stays small (bounded by the lookahead ring + in-flight moves).
    pub fn segment_at(&self, t: f64) -> Option<&MoveSegment> {
        let mut idx = self.active_head;
        while idx != NIL {
            let slot = self.slots[idx as usize].as_ref().unwrap();
            if t >= slot.seg.start_time && t <= slot.seg.end_time() {
                return Some(&slot.seg);
            }
            idx = slot.next;
        }
        let mut idx = self.history_head;
        while idx != NIL {
            let slot = self.slots[idx as usize].as_ref().unwrap();
            if t >= slot.seg.start_time && t <= slot.seg.end_time() {
                return Some(&slot.seg);
            }
            idx = slot.next;
        }
        None
    }

    /// Position at `t`, searching `active` then `history`.
    pub fn position_at(&self, t: f64) -> Option<[f64; 4]> {
        self.segment_at(t).map(|seg| seg.position_at(t))
    }

    /// The segment immediately following `after` in the active list, if
    /// any. Used by the iterative solver to step from one segment to the
    /// next without re-scanning from the head.
    pub fn next_active(&self, after: &MoveSegment) -> Option<&MoveSegment> {
        let mut idx = self.active_head;
        while idx != NIL {
            let slot = self.slots[idx as usize].as_ref().unwrap();
            if (slot.seg.start_time - after.start_time).abs() < 1e-12 {
                let nidx = slot.next;
                if nidx == NIL {
                    return None;
                }
                return Some(&self.slots[nidx as usize].as_ref().unwrap().seg);
            }
            idx = slot.next;
        }
        None
    }

    pub fn first_active(&self) -> Option<&MoveSegment> {
        if self.active_head == NIL {
            None
        } else {
            Some(&self.slots[self.active_head as usize].as_ref().unwrap().seg)
        }
    }

    /// Moves every active segment whose `end_time() <= t` onto `history`.
    pub fn finalize_before(&mut self, t: f64) {
        while self.active_head != NIL {
            let end_time = self.slots[self.active_head as usize]
                .as_ref()
                .unwrap()
                .seg
                .end_time();
            if end_time > t {
                break;
            }
            let idx = self.active_head;
            let next = self.slots[idx as usize].as_ref().unwrap().next;
            self.active_head = next;
            if self.active_head == NIL {
                self.active_tail = NIL;
            }
            self.slots[idx as usize].as_mut().unwrap().next = self.history_head;
            self.history_head = idx;
        }
    }

    /// Drops history segments whose `end_time() < t`, returning their
    /// slots to the free list.
    pub fn free_before(&mut self, t: f64) {
        let mut prev: u16 = NIL;
        let mut idx = self.history_head;
        while idx != NIL {
            let next = self.slots[idx as usize].as_ref().unwrap().next;
            if self.slots[idx as usize].as_ref().unwrap().seg.end_time() < t {
                if prev == NIL {
                    self.history_head = next;
                } else {
                    self.slots[prev as usize].as_mut().unwrap().next = next;
                }
                self.release(idx);
            } else {
                prev = idx;
            }
            idx = next;
        }
    }

    pub fn is_active_empty(&self) -> bool {
        self.active_head == NIL
    }
}

impl<const CAP: usize> Default for Trapq<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_seg(start: f64, start_pos: f64) -> (f64, f64, f64, f64, [f64; 4], [f64; 4], f64, f64, f64, f64) {
        (
            start,
            1.0,
            1.0,
            1.0,
            [start_pos, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            0.0,
            2.0,
            2.0,
            2.0,
        )
    }

    #[test]
    fn append_and_query_position() {
        let mut tq: Trapq<8> = Trapq::new();
        let (st, at, ct, dt, sp, ud, sv, cv, a, d) = simple_seg(0.0, 0.0);
        tq.append(st, at, ct, dt, sp, ud, sv, cv, a, d).unwrap();
        // At t=0, position is start_pos.
        assert_eq!(tq.position_at(0.0).unwrap()[0], 0.0);
        // At t=1 (end of accel phase), distance = 0*1 + 0.5*2*1 = 1.0
        let p1 = tq.position_at(1.0).unwrap()[0];
        assert!((p1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn i4_consecutive_segments_touch_in_time() {
        let mut tq: Trapq<8> = Trapq::new();
        let (st, at, ct, dt, sp, ud, sv, cv, a, d) = simple_seg(0.0, 0.0);
        tq.append(st, at, ct, dt, sp, ud, sv, cv, a, d).unwrap();
        let first_end = tq.first_active().unwrap().end_time();
        let (st2, at2, ct2, dt2, sp2, ud2, sv2, cv2, a2, d2) = simple_seg(first_end, 10.0);
        tq.append(st2, at2, ct2, dt2, sp2, ud2, sv2, cv2, a2, d2)
            .unwrap();
        let first = tq.first_active().unwrap();
        let second = tq.next_active(first).unwrap();
        assert!((first.end_time() - second.start_time).abs() < 1e-9);
    }

    #[test]
    fn finalize_and_free_before() {
        let mut tq: Trapq<4> = Trapq::new();
        let (st, at, ct, dt, sp, ud, sv, cv, a, d) = simple_seg(0.0, 0.0);
        tq.append(st, at, ct, dt, sp, ud, sv, cv, a, d).unwrap();
        let end = tq.first_active().unwrap().end_time();
        tq.finalize_before(end + 0.1);
        assert!(tq.is_active_empty());
        assert!(tq.position_at(end).is_some());
        tq.free_before(end + 1000.0);
        assert!(tq.position_at(end).is_none());
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let mut tq: Trapq<1> = Trapq::new();
        let (st, at, ct, dt, sp, ud, sv, cv, a, d) = simple_seg(0.0, 0.0);
        tq.append(st, at, ct, dt, sp, ud, sv, cv, a, d).unwrap();
        let end = tq.first_active().unwrap().end_time();
        let (st2, at2, ct2, dt2, sp2, ud2, sv2, cv2, a2, d2) = simple_seg(end, 10.0);
        let err = tq
            .append(st2, at2, ct2, dt2, sp2, ud2, sv2, cv2, a2, d2)
            .unwrap_err();
        assert_eq!(err, PlannerError::PoolExhausted);
    }
}
