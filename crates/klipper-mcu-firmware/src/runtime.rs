//! Ties every previously-standalone piece (the command dispatcher, the
//! motion planner/solver, the timer wheel, and the `mcu-drivers` step/
//! endstop/soft-PWM/thermistor drivers) into one cohesive, pollable
//! firmware core.
//!
//! [`Runtime`] owns the hardware collaborators directly rather than
//! behind trait objects: `OUT`/`IN` are the board's type-erased GPIO
//! pin types (e.g. `embassy_stm32::gpio::{Output<'static>,
//! Input<'static>}`), so one `Runtime` instantiation covers every axis,
//! endstop, and soft-PWM channel without a combinatorial explosion of
//! generic parameters. `ADC` is the hotend thermistor's single-shot
//! reader and `DELAY` is the busy-wait used for a step pulse's high
//! time; both are driver-agnostic `embedded-hal` traits so the same
//! `Runtime` code runs against real silicon or a fake pin in a test.
//!
//! Seconds-to-microseconds conversion happens in exactly one place —
//! [`EdgeSink::emit_step`] — matching `motion::solver`'s own doc
//! comment ("downstream of this module, when a produced edge time is
//! handed to the stepper driver").

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Deque;

use driver_endstop::Endstop;
use driver_softpwm::SoftPwmChannel;
use driver_stepper::{Direction, StepperDriver};
use driver_thermistor::{AdcRead, ThermistorChannel};
use motion::StepSink;

use crate::config::{self, axis};
use crate::dispatch::{Dispatcher, DispatchOutcome, HomingSwitch};
use crate::time::TimerWheel;

/// What a fired timer was for. One wheel, one payload type, per the
/// design in `time.rs` — no boxed callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerEvent {
    StepEdge(usize),
    EndstopPoll,
    HeaterTick,
    SoftPwmSlice,
}

/// Per-axis queue of step edges produced by one planner `flush()`,
/// waiting to be drained onto the timer wheel one at a time (the wheel
/// only ever holds the next due edge per axis, per `TIMER_WHEEL_CAPACITY`'s
/// doc comment).
type EdgeQueue = Deque<(u32, i8), { config::STEP_EDGE_QUEUE_CAPACITY }>;

/// Adapts `motion::StepSink`'s seconds-based callback onto the
/// microsecond-denominated edge queues. This is the system's one
/// seconds-to-microseconds conversion point: converting through `u64`
/// before truncating to `u32` reproduces the hardware clock's
/// wraparound (`u32` microseconds wrap every ~71 minutes) instead of
/// saturating, matching `time::before`'s wrap-aware comparison.
struct EdgeSink<'a> {
    pending: &'a mut [EdgeQueue; axis::COUNT],
}

impl StepSink for EdgeSink<'_> {
    fn emit_step(&mut self, axis: usize, time_s: f64, dir: i8) {
        let wake_us = ((time_s * 1_000_000.0).round() as u64) as u32;
        let _ = self.pending[axis].push_back((wake_us, dir));
    }
}

impl<PIN, E> HomingSwitch for Endstop<PIN>
where
    PIN: InputPin<Error = E>,
{
    fn enter_homing(&mut self) {
        let _ = Endstop::enter_homing(self);
    }

    fn exit_homing(&mut self) {
        Endstop::exit_homing(self);
    }

    fn sample_triggered(&mut self) -> bool {
        match self.poll() {
            Ok(_) => self.is_triggered(),
            Err(_) => false,
        }
    }
}

type FirmwareDispatcher = Dispatcher<{ config::LOOKAHEAD_CAPACITY }, { config::TRAPQ_CAPACITY }>;

/// One step/dir/enable driver per axis (X, Y, Z, E), uniformly typed —
/// the firmware has no per-axis pin-type differences to preserve.
type Steppers<OUT> = [StepperDriver<OUT, OUT, OUT>; axis::COUNT];

/// The firmware's entire live state: the command dispatcher and the
/// hardware it was missing a path to. Constructed once at board
/// bring-up and driven by [`Runtime::poll`] every main-loop turn.
pub struct Runtime<OUT, IN, ADC, DELAY> {
    dispatcher: FirmwareDispatcher,
    steppers: Steppers<OUT>,
    endstops: [Endstop<IN>; 3],
    hotend_pwm: SoftPwmChannel<OUT>,
    fan_pwm: SoftPwmChannel<OUT>,
    thermistor: ThermistorChannel<ADC>,
    delay: DELAY,
    timers: TimerWheel<TimerEvent, { config::TIMER_WHEEL_CAPACITY }>,
    pending_edges: [EdgeQueue; axis::COUNT],
    armed: [bool; axis::COUNT],
}

impl<OUT, IN, ADC, DELAY, OutErr, InErr, AdcErr> Runtime<OUT, IN, ADC, DELAY>
where
    OUT: OutputPin<Error = OutErr>,
    IN: InputPin<Error = InErr>,
    ADC: AdcRead<Error = AdcErr>,
    DELAY: DelayNs,
{
    /// Builds a runtime around its hardware collaborators. `steppers`
    /// is `[X, Y, Z, E]`; `endstops` is `[X, Y, Z]` (the extruder is
    /// never homed, per the dispatcher's homing queue).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: FirmwareDispatcher,
        steppers: Steppers<OUT>,
        endstops: [Endstop<IN>; 3],
        hotend_pwm: SoftPwmChannel<OUT>,
        fan_pwm: SoftPwmChannel<OUT>,
        thermistor: ThermistorChannel<ADC>,
        delay: DELAY,
        now_us: u32,
    ) -> Self {
        let mut timers = TimerWheel::new();
        let _ = timers.insert(now_us.wrapping_add(config::ENDSTOP_POLL_PERIOD_US), TimerEvent::EndstopPoll);
        let _ = timers.insert(now_us.wrapping_add(config::HEATER_TICK_PERIOD_US), TimerEvent::HeaterTick);
        let _ = timers.insert(
            now_us.wrapping_add(config::SOFT_PWM_SLICE_PERIOD_US),
            TimerEvent::SoftPwmSlice,
        );
        let mut steppers = steppers;
        for stepper in &mut steppers {
            let _ = stepper.enable();
        }
        Self {
            dispatcher,
            steppers,
            endstops,
            hotend_pwm,
            fan_pwm,
            thermistor,
            delay,
            timers,
            pending_edges: core::array::from_fn(|_| Deque::new()),
            armed: [false; axis::COUNT],
        }
    }

    pub fn dispatcher(&self) -> &FirmwareDispatcher {
        &self.dispatcher
    }

    /// Submits one received line. Any step edges the command produces
    /// synchronously (a `G0`/`G1` or the first leg of a `G28`) are
    /// queued and armed immediately, same as a subsequent timer-driven
    /// edge would be.
    pub fn submit_line(&mut self, line: &str, now_us: u32) -> DispatchOutcome {
        let mut sink = EdgeSink { pending: &mut self.pending_edges };
        let mut homing = self.homing_switches();
        let outcome = self.dispatcher.dispatch_line(line, now_us, &mut homing, &mut sink);
        self.arm_due_axes();
        outcome
    }

    /// Drains every timer due at `now_us`: fires queued step edges,
    /// polls the endstops and re-arms them, ticks the hotend PID loop,
    /// advances the soft-PWM channels, and services whatever G28/M109
    /// episode is in flight. Returns the resolved outcome the instant
    /// a pending command completes.
    pub fn poll(&mut self, now_us: u32) -> Option<DispatchOutcome> {
        let mut timers = core::mem::take(&mut self.timers);
        timers.dispatch(now_us, |event, wake_time| self.handle_timer(event, wake_time));
        self.timers = timers;

        if self.dispatcher.is_busy() {
            let mut sink = EdgeSink { pending: &mut self.pending_edges };
            let mut homing = self.homing_switches();
            let resolved = self.dispatcher.service(now_us, &mut homing, &mut sink);
            self.arm_due_axes();
            return resolved;
        }
        None
    }

    fn homing_switches(&mut self) -> [&mut dyn HomingSwitch; 3] {
        let [x, y, z] = &mut self.endstops;
        [x, y, z]
    }

    fn handle_timer(&mut self, event: TimerEvent, wake_time: u32) -> Option<u32> {
        match event {
            TimerEvent::StepEdge(axis) => self.fire_step_edge(axis, wake_time),
            TimerEvent::EndstopPoll => {
                for endstop in &mut self.endstops {
                    let _ = endstop.poll();
                }
                Some(wake_time.wrapping_add(config::ENDSTOP_POLL_PERIOD_US))
            }
            TimerEvent::HeaterTick => {
                let code = self.thermistor.read_code();
                let duty = self.dispatcher.tick_heater(code);
                let _ = self.hotend_pwm.set_fraction(duty as f32);
                Some(wake_time.wrapping_add(config::HEATER_TICK_PERIOD_US))
            }
            TimerEvent::SoftPwmSlice => {
                let _ = self.hotend_pwm.tick();
                let _ = self.fan_pwm.tick();
                Some(wake_time.wrapping_add(config::SOFT_PWM_SLICE_PERIOD_US))
            }
        }
    }

    /// Fires the next queued edge for `axis`, then arms the one behind
    /// it if any remain. The armed edge's own wake time (not
    /// necessarily `wake_time`, which is when the wheel happened to
    /// dispatch it) is what actually reaches the stepper driver.
    fn fire_step_edge(&mut self, axis: usize, wake_time: u32) -> Option<u32> {
        self.armed[axis] = false;
        let Some((due_us, dir)) = self.pending_edges[axis].pop_front() else {
            return None;
        };
        let _ = self.steppers[axis].set_direction(Direction::from_sign(dir));
        let delay = &mut self.delay;
        let _ = self.steppers[axis].step_edge(due_us, |pulse_us| delay.delay_us(pulse_us));
        let _ = wake_time;
        self.arm_axis(axis);
        None
    }

    /// Arms the next queued edge for every axis that doesn't already
    /// have one on the wheel. Called after any command that may have
    /// produced fresh edges.
    fn arm_due_axes(&mut self) {
        for axis in 0..axis::COUNT {
            self.arm_axis(axis);
        }
    }

    fn arm_axis(&mut self, axis: usize) {
        if self.armed[axis] {
            return;
        }
        if let Some(&(wake_us, _dir)) = self.pending_edges[axis].front() {
            if self.timers.insert(wake_us, TimerEvent::StepEdge(axis)).is_ok() {
                self.armed[axis] = true;
            }
        }
    }
}
