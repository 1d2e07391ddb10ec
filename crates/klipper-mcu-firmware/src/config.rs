//! Static configuration. Every pool capacity and tuning constant the
//! firmware uses is a compile-time value here; nothing in this crate
//! allocates, and nothing is read from a runtime config file (there is
//! no filesystem). Board-specific pin identity lives in `boards/`.

/// Axis indices into the 4-wide position/solver arrays (`motion` is
/// Cartesian-only, X/Y/Z plus one extruder).
pub mod axis {
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const Z: usize = 2;
    pub const E: usize = 3;
    pub const COUNT: usize = 4;
}

/// Lookahead ring capacity (`L` in `motion::Toolhead<L, CAP>`).
pub const LOOKAHEAD_CAPACITY: usize = 16;
/// Trapq move-pool capacity (`CAP` in `motion::Toolhead<L, CAP>`).
pub const TRAPQ_CAPACITY: usize = 32;
/// Timer wheel pool size: one slot per stepper axis, one for the
/// endstop sampler, one per heater, one per fan, plus headroom.
pub const TIMER_WHEEL_CAPACITY: usize = 16;
/// Per-axis pending step-edge queue depth (edges produced by one
/// `flush()` call waiting to be drained onto real timers).
pub const STEP_EDGE_QUEUE_CAPACITY: usize = 256;
/// Serial RX line buffer length, matching ASCII grammar
/// (a command plus its parameters comfortably fits well under this).
pub const LINE_BUFFER_CAPACITY: usize = 128;
/// Serial RX byte ring buffer between the UART ISR and the main loop.
pub const RX_RING_CAPACITY: usize = 256;

pub const HOMING_SPEED_MM_S: f64 = 10.0;
pub const HOMING_SPEED_FACTOR: f64 = 2.0;
pub const HOMING_RETRACT_MM: f64 = 5.0;
pub const HOMING_RETRACT_SPEED_MM_S: f64 = 5.0;
/// Upper bound on one homing episode before it reports `error: homing_timeout`.
pub const HOMING_TIMEOUT_US: u32 = 30_000_000;
/// Distance added beyond the configured soft-max travel when homing
/// "well beyond the axis span" towards the min limit.
pub const HOMING_OVERTRAVEL_MM: f64 = 10.0;

/// Endstop sampling period: "on the order of 1kHz".
pub const ENDSTOP_POLL_PERIOD_US: u32 = 1_000;

/// Heater PID tick period: "executes on a fixed period,
/// nominally every 100ms".
pub const HEATER_TICK_PERIOD_US: u32 = 100_000;
pub const HEATER_TICK_DT_S: f64 = HEATER_TICK_PERIOD_US as f64 / 1_000_000.0;
pub const HEATER_AT_TARGET_TOLERANCE_C: f64 = 2.0;
pub const HEATER_INTEGRAL_MAX: f64 = 100.0;
pub const HEATER_MAX_POWER: f64 = 1.0;
pub const HOTEND_PID_KP: f64 = 20.0;
pub const HOTEND_PID_KI: f64 = 2.0;
pub const HOTEND_PID_KD: f64 = 40.0;

/// Input low-pass filter applied to raw thermistor temperature before
/// it reaches the PID loop or the safety monitor (`thermal::LowPassFilter`).
pub const HEATER_FILTER_ALPHA: f64 = 0.2;
/// `thermal::SafetyLimits` for the hotend heater: absolute ceiling,
/// minimum expected gain, the window it's checked over, and the
/// allowed deviation from setpoint once at temperature.
pub const HEATER_SAFETY_MAX_TEMP_C: f64 = 285.0;
pub const HEATER_SAFETY_MIN_GAIN_TEMP_C: f64 = 2.0;
pub const HEATER_SAFETY_MIN_GAIN_TIME_S: f64 = 30.0;
pub const HEATER_SAFETY_MAX_DEVIATION_C: f64 = 10.0;

/// Soft-PWM cycle length, shared by heaters and fans: `N` slices of
/// `SOFT_PWM_SLICE_PERIOD_US` make up one full PWM period.
pub const SOFT_PWM_CYCLE_SLICES: u16 = 100;
pub const SOFT_PWM_SLICE_PERIOD_US: u32 = 1_000;

/// Stepper edge timing: the smallest allowed inter-edge interval and
/// the busy-wait pulse width held high/low on a step edge. Both are
/// config knobs rather than hard-coded, since they are driver-dependent.
pub const MIN_STEP_INTERVAL_US: u32 = 2;
pub const STEP_PULSE_WIDTH_US: u32 = 2;

pub const DEFAULT_FEEDRATE_MM_PER_MIN: f64 = 3000.0;
pub const DEFAULT_MAX_VELOCITY_MM_S: f64 = 300.0;
pub const DEFAULT_MAX_ACCEL_MM_S2: f64 = 3000.0;
pub const DEFAULT_MAX_ACCEL_TO_DECEL_MM_S2: f64 = 3000.0;
pub const DEFAULT_SQUARE_CORNER_VELOCITY_MM_S: f64 = 5.0;

pub const STEPS_PER_MM_X: f64 = 80.0;
pub const STEPS_PER_MM_Y: f64 = 80.0;
pub const STEPS_PER_MM_Z: f64 = 400.0;
pub const STEPS_PER_MM_E: f64 = 400.0;

pub const SOFT_MIN_X_MM: f64 = 0.0;
pub const SOFT_MAX_X_MM: f64 = 235.0;
pub const SOFT_MIN_Y_MM: f64 = 0.0;
pub const SOFT_MAX_Y_MM: f64 = 235.0;
pub const SOFT_MIN_Z_MM: f64 = 0.0;
pub const SOFT_MAX_Z_MM: f64 = 250.0;
