//! Command Dispatcher: receives one line from the serial byte
//! transport (an external collaborator), parses it with
//! [`crate::command`], and mutates the planner, heater, and
//! fan state it owns. Every accepted line produces exactly one
//! response line; see [`DispatchOutcome`] and [`write_response`].
//!
//! G28 and M109 cannot complete synchronously: both are naturally a
//! state machine spread across several main-loop turns. Both return
//! [`DispatchOutcome::Pending`] and leave the dispatcher's `pending`
//! field set; the main loop must call [`Dispatcher::service`] on every
//! turn until it returns `Some(..)`, at which point *that* is the one
//! response line for the original command. No blocking wait happens
//! anywhere in this module.

use heapless::Vec;

use motion::{AxisConfig, PlannerError, StepSink, Toolhead, ToolheadConfig};
use thermal::{FanController, Heater};

use crate::command::{self, Command};
use crate::config::{self, axis};
use crate::time::before;

/// G90/G91: whether a missing axis letter on G0/G1 means "unchanged"
/// (absolute) or "zero displacement" (relative). Both
/// resolve to the same target (`current position`), so the two modes
/// only diverge when an axis letter *is* present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositioningMode {
    Absolute,
    Relative,
}

/// Result of dispatching one line, before it has been rendered to text.
/// Kept structured (rather than a pre-formatted string) so callers that
/// want the data — e.g. a test asserting on the reported position —
/// don't have to parse it back out of `write_response`'s output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    Ok,
    Position([f64; axis::COUNT]),
    Temperature { current_c: f64, target_c: f64 },
    /// G28 or M109 started; call [`Dispatcher::service`] every main-loop
    /// turn (with fresh endstop samples / the current temperature)
    /// until it yields the real outcome.
    Pending,
    Err(&'static str),
}

/// One step of the homing episode's fast-approach state: the
/// full ordered list of axes to home this episode, which one is
/// currently being driven toward its endstop, and the deadline for
/// `HomingFailed`.
struct HomingStep {
    queue: Vec<usize, { axis::COUNT - 1 }>,
    cursor: usize,
    deadline_us: u32,
}

enum Pending {
    Homing(HomingStep),
    WaitHotend,
}

/// What the dispatcher needs from a homing axis's endstop: enter/exit
/// the homing window (so an already-tripped switch doesn't fire
/// immediately, matching `driver_endstop::Endstop`'s own contract) and
/// a debounced triggered sample. Implemented generically for
/// `driver_endstop::Endstop<PIN>` in `runtime`; a fixed test double
/// implements it directly below.
pub trait HomingSwitch {
    fn enter_homing(&mut self);
    fn exit_homing(&mut self);
    fn sample_triggered(&mut self) -> bool;
}

/// Ties the motion planner, the hotend heater, and the part-cooling fan
/// into the single piece of state the command stream mutates. Generic
/// over the lookahead ring capacity `L` and trapq pool capacity `CAP`,
/// matching `Toolhead`'s own compile-time pool-size parameters.
pub struct Dispatcher<const L: usize, const CAP: usize> {
    toolhead: Toolhead<L, CAP>,
    mode: PositioningMode,
    feedrate_mm_s: f64,
    hotend: Heater<'static>,
    fan: FanController,
    /// Precomputed per-axis "well beyond the axis span" homing target,
    /// X/Y/Z only — the extruder is never homed.
    home_target: [f64; 3],
    pending: Option<Pending>,
}

impl<const L: usize, const CAP: usize> Dispatcher<L, CAP> {
    pub fn new(toolhead_config: ToolheadConfig, hotend: Heater<'static>) -> Self {
        let mut home_target = [0.0; 3];
        for i in 0..3 {
            let min = toolhead_config.axes[i].soft_min.unwrap_or(0.0);
            home_target[i] = min - config::HOMING_OVERTRAVEL_MM;
        }
        Self {
            toolhead: Toolhead::new(toolhead_config),
            mode: PositioningMode::Absolute,
            feedrate_mm_s: config::DEFAULT_FEEDRATE_MM_PER_MIN / 60.0,
            hotend,
            fan: FanController::new(),
            home_target,
            pending: None,
        }
    }

    pub fn toolhead(&self) -> &Toolhead<L, CAP> {
        &self.toolhead
    }

    pub fn hotend(&self) -> &Heater<'static> {
        &self.hotend
    }

    pub fn fan(&self) -> &FanController {
        &self.fan
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs the hotend's PID tick independent of whatever
    /// command is in flight; the main loop calls this on its own period
    /// regardless of `is_busy()`.
    pub fn tick_heater(&mut self, adc_code: Option<u16>) -> f64 {
        self.hotend.tick(adc_code, config::HEATER_TICK_DT_S)
    }

    /// Parses and dispatches one line. Returns `Pending` for G28/M109;
    /// the caller must keep calling [`Self::service`] until it resolves.
    /// `endstops` is only consulted by G28 (to arm the first axis's
    /// homing window); every other command ignores it.
    pub fn dispatch_line(
        &mut self,
        line: &str,
        now_us: u32,
        endstops: &mut [&mut dyn HomingSwitch; 3],
        sink: &mut impl StepSink,
    ) -> DispatchOutcome {
        if self.pending.is_some() {
            // A second line arriving mid-episode has nowhere to go:
            // reject it rather than silently reordering or queuing it.
            return DispatchOutcome::Err("execution failed");
        }
        match command::parse(line) {
            Ok(cmd) => self.dispatch(cmd, now_us, endstops, sink),
            Err(e) => DispatchOutcome::Err(e.as_str()),
        }
    }

    fn dispatch(
        &mut self,
        cmd: Command,
        now_us: u32,
        endstops: &mut [&mut dyn HomingSwitch; 3],
        sink: &mut impl StepSink,
    ) -> DispatchOutcome {
        match cmd {
            Command::Empty => DispatchOutcome::Ok,
            Command::SetAbsolutePositioning => {
                self.mode = PositioningMode::Absolute;
                DispatchOutcome::Ok
            }
            Command::SetRelativePositioning => {
                self.mode = PositioningMode::Relative;
                DispatchOutcome::Ok
            }
            Command::LinearMove { x, y, z, e, f } => self.linear_move(x, y, z, e, f, sink),
            Command::Home { x, y, z } => self.start_homing(x, y, z, now_us, endstops, sink),
            Command::SetHotendTemp { target_c } => {
                self.hotend.set_target(target_c);
                DispatchOutcome::Ok
            }
            Command::WaitHotendTemp { target_c } => {
                self.hotend.set_target(target_c);
                self.pending = Some(Pending::WaitHotend);
                DispatchOutcome::Pending
            }
            Command::SetFanSpeed { pwm_255 } => {
                self.fan.set(pwm_255 as f32 / 255.0);
                DispatchOutcome::Ok
            }
            Command::FanOff => {
                self.fan.set(0.0);
                DispatchOutcome::Ok
            }
            Command::ReportPosition => DispatchOutcome::Position(self.toolhead.commanded_position()),
            Command::ReportTemperature => DispatchOutcome::Temperature {
                current_c: self.hotend.current_temp(),
                target_c: self.hotend.target_temp(),
            },
            Command::DisableSteppers => DispatchOutcome::Ok,
        }
    }

    fn linear_move(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
        sink: &mut impl StepSink,
    ) -> DispatchOutcome {
        if let Some(f_mm_min) = f {
            self.feedrate_mm_s = f_mm_min.max(0.0) / 60.0;
        }
        let current = self.toolhead.commanded_position();
        let mut target = current;
        for (axis, requested) in [axis::X, axis::Y, axis::Z, axis::E]
            .into_iter()
            .zip([x, y, z, e])
        {
            if let Some(v) = requested {
                target[axis] = match self.mode {
                    PositioningMode::Absolute => v,
                    PositioningMode::Relative => current[axis] + v,
                };
            }
        }
        match self.toolhead.queue_move(target, self.feedrate_mm_s, sink) {
            Ok(()) => DispatchOutcome::Ok,
            Err(PlannerError::OutOfBounds) => DispatchOutcome::Err("invalid command"),
            Err(PlannerError::QueueFull) | Err(PlannerError::PoolExhausted) => {
                DispatchOutcome::Err("execution failed")
            }
        }
    }

    fn start_homing(
        &mut self,
        x: bool,
        y: bool,
        z: bool,
        now_us: u32,
        endstops: &mut [&mut dyn HomingSwitch; 3],
        sink: &mut impl StepSink,
    ) -> DispatchOutcome {
        let mut queue: Vec<usize, { axis::COUNT - 1 }> = Vec::new();
        for (flag, a) in [(x, axis::X), (y, axis::Y), (z, axis::Z)] {
            if flag {
                let _ = queue.push(a);
            }
        }
        if queue.is_empty() {
            return DispatchOutcome::Ok;
        }
        self.toolhead.relax_soft_limits();
        endstops[queue[0]].enter_homing();
        if let Err(e) = self.begin_axis_homing_move(queue[0], sink) {
            endstops[queue[0]].exit_homing();
            self.toolhead.restore_soft_limits();
            return planner_error_outcome(e);
        }
        self.pending = Some(Pending::Homing(HomingStep {
            queue,
            cursor: 0,
            deadline_us: now_us.wrapping_add(config::HOMING_TIMEOUT_US),
        }));
        DispatchOutcome::Pending
    }

    fn begin_axis_homing_move(
        &mut self,
        axis: usize,
        sink: &mut impl StepSink,
    ) -> Result<(), PlannerError> {
        let mut target = self.toolhead.commanded_position();
        target[axis] = self.home_target[axis];
        let speed = config::HOMING_SPEED_MM_S * config::HOMING_SPEED_FACTOR;
        self.toolhead.queue_move(target, speed, sink)?;
        self.toolhead.flush(sink)
    }

    fn retract_axis(&mut self, axis: usize, sink: &mut impl StepSink) -> Result<(), PlannerError> {
        let mut target = self.toolhead.commanded_position();
        target[axis] = config::HOMING_RETRACT_MM;
        self.toolhead
            .queue_move(target, config::HOMING_RETRACT_SPEED_MM_S, sink)?;
        self.toolhead.flush(sink)
    }

    /// Advances whatever is [`Pending`]. `endstops[axis]` is the real
    /// `Endstop<PIN>`-backed switch for X/Y/Z (the caller owns the
    /// driver instances and polls them at ~1kHz — this dispatcher only
    /// calls `sample_triggered`/`enter_homing`/`exit_homing` on them at
    /// the right points in the episode). Returns `None` while the
    /// episode is still in flight; the main loop must not block waiting
    /// for `Some`, it should just call again next turn.
    pub fn service(
        &mut self,
        now_us: u32,
        endstops: &mut [&mut dyn HomingSwitch; 3],
        sink: &mut impl StepSink,
    ) -> Option<DispatchOutcome> {
        match self.pending.take() {
            None => None,
            Some(Pending::WaitHotend) => {
                if self
                    .hotend
                    .at_target(config::HEATER_AT_TARGET_TOLERANCE_C)
                {
                    Some(DispatchOutcome::Ok)
                } else {
                    self.pending = Some(Pending::WaitHotend);
                    None
                }
            }
            Some(Pending::Homing(step)) => self.service_homing(step, now_us, endstops, sink),
        }
    }

    fn service_homing(
        &mut self,
        step: HomingStep,
        now_us: u32,
        endstops: &mut [&mut dyn HomingSwitch; 3],
        sink: &mut impl StepSink,
    ) -> Option<DispatchOutcome> {
        let axis = step.queue[step.cursor];
        if !endstops[axis].sample_triggered() {
            if before(step.deadline_us, now_us) {
                endstops[axis].exit_homing();
                self.toolhead.restore_soft_limits();
                return Some(DispatchOutcome::Err("execution failed"));
            }
            self.pending = Some(Pending::Homing(step));
            return None;
        }
        endstops[axis].exit_homing();

        // Triggered: zero this axis at the trigger point, then retract off the switch.
        let mut pos = self.toolhead.commanded_position();
        pos[axis] = 0.0;
        self.toolhead.set_position(pos);
        if let Err(e) = self.retract_axis(axis, sink) {
            self.toolhead.restore_soft_limits();
            return Some(planner_error_outcome(e));
        }

        let next_cursor = step.cursor + 1;
        if next_cursor == step.queue.len() {
            self.toolhead.restore_soft_limits();
            return Some(DispatchOutcome::Ok);
        }
        let next_axis = step.queue[next_cursor];
        endstops[next_axis].enter_homing();
        if let Err(e) = self.begin_axis_homing_move(next_axis, sink) {
            endstops[next_axis].exit_homing();
            self.toolhead.restore_soft_limits();
            return Some(planner_error_outcome(e));
        }
        self.pending = Some(Pending::Homing(HomingStep {
            queue: step.queue,
            cursor: next_cursor,
            deadline_us: now_us.wrapping_add(config::HOMING_TIMEOUT_US),
        }));
        None
    }
}

fn planner_error_outcome(e: PlannerError) -> DispatchOutcome {
    match e {
        PlannerError::OutOfBounds => DispatchOutcome::Err("invalid command"),
        PlannerError::QueueFull | PlannerError::PoolExhausted => {
            DispatchOutcome::Err("execution failed")
        }
    }
}

/// Renders a [`DispatchOutcome`] as the exact wire-format line: `ok`,
/// `error: <kind>`, or the `M114` position report, each `\r\n`-terminated.
pub fn write_response(outcome: DispatchOutcome, out: &mut impl core::fmt::Write) -> core::fmt::Result {
    match outcome {
        DispatchOutcome::Ok => write!(out, "ok\r\n"),
        DispatchOutcome::Err(kind) => write!(out, "error: {kind}\r\n"),
        DispatchOutcome::Position(pos) => write!(
            out,
            "X:{:.2} Y:{:.2} Z:{:.2} E:{:.2}\r\n",
            pos[axis::X],
            pos[axis::Y],
            pos[axis::Z],
            pos[axis::E]
        ),
        DispatchOutcome::Temperature { current_c, target_c } => {
            write!(out, "ok T:{current_c:.2} /{target_c:.2}\r\n")
        }
        DispatchOutcome::Pending => {
            // Never reaches the wire: the main loop waits for `service`
            // to resolve this into a concrete outcome first.
            Ok(())
        }
    }
}

/// Convenience: builds the default Cartesian `ToolheadConfig` from
/// `config.rs`'s compile-time constants: X/Y/Z soft-limited, E
/// unlimited.
pub fn default_toolhead_config() -> ToolheadConfig {
    ToolheadConfig {
        axes: [
            AxisConfig {
                steps_per_mm: config::STEPS_PER_MM_X,
                soft_min: Some(config::SOFT_MIN_X_MM),
                soft_max: Some(config::SOFT_MAX_X_MM),
            },
            AxisConfig {
                steps_per_mm: config::STEPS_PER_MM_Y,
                soft_min: Some(config::SOFT_MIN_Y_MM),
                soft_max: Some(config::SOFT_MAX_Y_MM),
            },
            AxisConfig {
                steps_per_mm: config::STEPS_PER_MM_Z,
                soft_min: Some(config::SOFT_MIN_Z_MM),
                soft_max: Some(config::SOFT_MAX_Z_MM),
            },
            AxisConfig::unlimited(config::STEPS_PER_MM_E),
        ],
        max_velocity: config::DEFAULT_MAX_VELOCITY_MM_S,
        max_accel: config::DEFAULT_MAX_ACCEL_MM_S2,
        max_accel_to_decel: config::DEFAULT_MAX_ACCEL_TO_DECEL_MM_S2,
        square_corner_velocity: config::DEFAULT_SQUARE_CORNER_VELOCITY_MM_S,
    }
}
