//! Timer Wheel: a single-producer/single-consumer, time-ordered set
//! of scheduled callbacks.
//!
//! No heap: timers live in a fixed-capacity arena (`CAP`) and are linked
//! by index, the same intrusive-list-over-an-arena shape as `motion`'s
//! trapq (see that module's doc comment for the rationale). Each slot
//! additionally carries a generation counter so a stale handle from a
//! timer that has already fired (and whose slot has been recycled)
//! cannot be mistaken for the new occupant — `insert`/`cancel` validate
//! the generation, turning the classic "ABA" arena bug into a checked
//! no-op instead of silently cancelling the wrong timer.
//!
//! The wheel stores a small `Copy` payload per timer (this firmware's
//! closed set of timer purposes: which stepper axis, the endstop
//! sampler, a heater's tick, a soft-PWM channel's slice) rather than a
//! boxed callback; there is no dynamic dispatch and no allocation. The
//! main loop's `dispatch` drains due timers and, for each, runs the
//! matching subsystem logic itself before deciding whether to
//! re-insert — this is the callback this describes, just inlined
//! into the dispatch loop instead of stored as a closure.

#![allow(dead_code)]

const NIL: u16 = u16::MAX;

/// Wrap-aware "t1 is before t2" ordering: `(int32)(t1-t2) < 0`.
pub fn before(t1: u32, t2: u32) -> bool {
    (t1.wrapping_sub(t2) as i32) < 0
}

/// A handle returned by [`TimerWheel::insert`]. Carries a generation so a
/// handle that outlives its slot's reuse cannot alias a different timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle {
    index: u16,
    generation: u32,
}

struct Slot<T> {
    wake_time: u32,
    payload: T,
    next: u16,
    generation: u32,
}

/// Error returned when the wheel's fixed capacity is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WheelFull;

/// The timer wheel. `T` is the per-timer payload (a small `Copy` tag
/// identifying what the timer is for); `CAP` is the compile-time pool
/// size: firmware pools are always fixed-size, no `alloc`.
pub struct TimerWheel<T: Copy, const CAP: usize> {
    slots: [Option<Slot<T>>; CAP],
    head: u16,
    free_head: u16,
}

impl<T: Copy, const CAP: usize> TimerWheel<T, CAP> {
    pub fn new() -> Self {
        let mut slots: [Option<Slot<T>>; CAP] = core::array::from_fn(|_| None);
        for i in 0..CAP {
            // Free list threaded through `next`; `generation` starts at 0
            // and is bumped on every insert into that slot.
            slots[i] = None;
            let _ = &mut slots[i];
        }
        let mut wheel = Self {
            slots,
            head: NIL,
            free_head: 0,
        };
        for i in 0..CAP {
            wheel.slots[i] = Some(Slot {
                wake_time: 0,
                // SAFETY-free placeholder: never read before a real
                // insert overwrites it; the slot is only reachable via
                // `free_head` until claimed.
                payload: unsafe { core::mem::zeroed() },
                next: if i + 1 < CAP { (i + 1) as u16 } else { NIL },
                generation: 0,
            });
        }
        wheel
    }

    fn claim(&mut self) -> Result<u16, WheelFull> {
        if self.free_head == NIL {
            return Err(WheelFull);
        }
        let idx = self.free_head;
        self.free_head = self.slots[idx as usize].as_ref().unwrap().next;
        Ok(idx)
    }

    fn release(&mut self, idx: u16) {
        let slot = self.slots[idx as usize].as_mut().unwrap();
        slot.generation = slot.generation.wrapping_add(1);
        slot.next = self.free_head;
        self.free_head = idx;
    }

    /// Inserts a timer at `wake_time`, walking the ordered list and
    /// inserting before the first entry whose wake-time is strictly
    /// later). Interrupts must be disabled around
    /// this call on real hardware; the sim/test build is single-threaded
    /// so no critical section is modeled here.
    pub fn insert(&mut self, wake_time: u32, payload: T) -> Result<TimerHandle, WheelFull> {
        let idx = self.claim()?;
        {
            let slot = self.slots[idx as usize].as_mut().unwrap();
            slot.wake_time = wake_time;
            slot.payload = payload;
        }
        let handle = TimerHandle {
            index: idx,
            generation: self.slots[idx as usize].as_ref().unwrap().generation,
        };

        if self.head == NIL || before(wake_time, self.slots[self.head as usize].as_ref().unwrap().wake_time) {
            self.slots[idx as usize].as_mut().unwrap().next = self.head;
            self.head = idx;
            return Ok(handle);
        }
        let mut prev = self.head;
        loop {
            let next = self.slots[prev as usize].as_ref().unwrap().next;
            if next == NIL || before(wake_time, self.slots[next as usize].as_ref().unwrap().wake_time) {
                self.slots[idx as usize].as_mut().unwrap().next = next;
                self.slots[prev as usize].as_mut().unwrap().next = idx;
                return Ok(handle);
            }
            prev = next;
        }
    }

    /// Cancels a still-enqueued timer. A no-op if the handle's slot has
    /// already been dispatched or recycled (generation mismatch).
    pub fn cancel(&mut self, handle: TimerHandle) {
        if self.slots[handle.index as usize]
            .as_ref()
            .map(|s| s.generation != handle.generation)
            .unwrap_or(true)
        {
            return;
        }
        let mut prev: Option<u16> = None;
        let mut idx = self.head;
        while idx != NIL {
            if idx == handle.index {
                let next = self.slots[idx as usize].as_ref().unwrap().next;
                match prev {
                    Some(p) => self.slots[p as usize].as_mut().unwrap().next = next,
                    None => self.head = next,
                }
                self.release(idx);
                return;
            }
            prev = Some(idx);
            idx = self.slots[idx as usize].as_ref().unwrap().next;
        }
    }

    pub fn peek_wake_time(&self) -> Option<u32> {
        if self.head == NIL {
            None
        } else {
            Some(self.slots[self.head as usize].as_ref().unwrap().wake_time)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Dispatches every due timer (head's wake-time not after `now`),
    /// calling `f(payload, wake_time)` for each; a callback that returns
    /// `Some(next_wake_time)` is re-inserted: "rescheduled
    /// *after* it returns, so its successor in the list cannot starve."
    pub fn dispatch(&mut self, now: u32, mut f: impl FnMut(T, u32) -> Option<u32>) {
        loop {
            let Some(due_wake) = self.peek_wake_time() else {
                return;
            };
            if before(now, due_wake) {
                return;
            }
            let idx = self.head;
            let slot = self.slots[idx as usize].as_ref().unwrap();
            let wake_time = slot.wake_time;
            let payload = slot.payload;
            self.head = slot.next;
            self.release(idx);

            if let Some(next_wake) = f(payload, wake_time) {
                // Best-effort: a full wheel silently drops the
                // reschedule rather than panicking; its "no
                // fatal" failure mode covers a slipping scheduler, not
                // a crashing one.
                let _ = self.insert(next_wake, payload);
            }
        }
    }
}

impl<T: Copy, const CAP: usize> Default for TimerWheel<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Id {
        A,
        B,
        C,
    }

    #[test]
    fn before_handles_wraparound() {
        assert!(before(10, 20));
        assert!(!before(20, 10));
        assert!(before(u32::MAX, 5));
        assert!(!before(5, u32::MAX));
    }

    #[test]
    fn dispatch_runs_due_timers_in_order() {
        let mut wheel: TimerWheel<Id, 8> = TimerWheel::new();
        wheel.insert(100, Id::B).unwrap();
        wheel.insert(50, Id::A).unwrap();
        wheel.insert(150, Id::C).unwrap();

        let mut order = heapless::Vec::<Id, 8>::new();
        wheel.dispatch(120, |payload, _wake| {
            let _ = order.push(payload);
            None
        });
        assert_eq!(order.as_slice(), &[Id::A, Id::B]);
        assert_eq!(wheel.peek_wake_time(), Some(150));
    }

    #[test]
    fn not_due_timer_is_left_alone() {
        let mut wheel: TimerWheel<Id, 4> = TimerWheel::new();
        wheel.insert(1_000, Id::A).unwrap();
        let mut fired = false;
        wheel.dispatch(500, |_, _| {
            fired = true;
            None
        });
        assert!(!fired);
    }

    #[test]
    fn reschedule_reinserts_with_new_wake_time() {
        let mut wheel: TimerWheel<Id, 4> = TimerWheel::new();
        wheel.insert(10, Id::A).unwrap();
        let mut ticks = 0;
        wheel.dispatch(100, |_, wake| {
            ticks += 1;
            if ticks < 3 {
                Some(wake + 10)
            } else {
                None
            }
        });
        assert_eq!(ticks, 3);
        assert!(wheel.is_empty());
    }

    #[test]
    fn cancel_removes_enqueued_timer() {
        let mut wheel: TimerWheel<Id, 4> = TimerWheel::new();
        let h = wheel.insert(100, Id::A).unwrap();
        wheel.insert(200, Id::B).unwrap();
        wheel.cancel(h);
        let mut order = heapless::Vec::<Id, 4>::new();
        wheel.dispatch(1000, |p, _| {
            let _ = order.push(p);
            None
        });
        assert_eq!(order.as_slice(), &[Id::B]);
    }

    #[test]
    fn cancel_after_dispatch_is_a_safe_no_op() {
        let mut wheel: TimerWheel<Id, 4> = TimerWheel::new();
        let h = wheel.insert(10, Id::A).unwrap();
        wheel.dispatch(10, |_, _| None);
        // Slot was recycled; re-inserting a new timer into the same
        // slot must not be disturbed by the stale handle.
        let h2 = wheel.insert(20, Id::B).unwrap();
        wheel.cancel(h);
        assert!(!wheel.is_empty());
        let _ = h2;
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let mut wheel: TimerWheel<Id, 2> = TimerWheel::new();
        wheel.insert(1, Id::A).unwrap();
        wheel.insert(2, Id::B).unwrap();
        assert_eq!(wheel.insert(3, Id::C), Err(WheelFull));
    }
}
