//! A `no_std` per-axis step/dir/enable stepper driver.
//!
//! One instance per stepper axis. The driver owns only the physical pins,
//! their polarity, and the invariants that are properties of the silicon
//! (minimum pulse width, minimum inter-edge interval) plus the commanded
//! position counter. Scheduling *when* the next edge fires is the timer
//! wheel's job, upstream of this crate; this driver only knows how to
//! emit one edge, right now, safely.

#![no_std]

use embedded_hal::digital::{OutputPin, PinState};

/// Step direction, matching its signed step count convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn from_sign(sign: i8) -> Self {
        if sign >= 0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }
}

/// Errors a stepper driver operation can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepperError<E> {
    /// The underlying GPIO operation failed.
    Pin(E),
    /// The caller tried to emit an edge sooner than `min_interval_us`
    /// after the previous one. This should never happen if the
    /// scheduler upstream respects the interval it was given; it's a
    /// defensive check, not a normal-path outcome.
    TooSoon,
}

/// A per-axis step/dir/enable driver.
///
/// `min_interval_us` and `pulse_width_us` are configuration knobs rather
/// than hard-coded constants.
pub struct StepperDriver<STEP, DIR, EN> {
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    invert_step: bool,
    invert_dir: bool,
    invert_enable: bool,
    enabled: bool,
    direction: Direction,
    position: i64,
    min_interval_us: u32,
    pulse_width_us: u32,
    last_edge_us: Option<u32>,
}

impl<STEP, DIR, EN, E> StepperDriver<STEP, DIR, EN>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
{
    /// Builds a driver around its three control pins. The enable pin is
    /// left in the disabled state; callers must call [`enable`] before
    /// queuing motion.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        step_pin: STEP,
        dir_pin: DIR,
        enable_pin: EN,
        invert_step: bool,
        invert_dir: bool,
        invert_enable: bool,
        min_interval_us: u32,
        pulse_width_us: u32,
    ) -> Result<Self, E> {
        let mut driver = Self {
            step_pin,
            dir_pin,
            enable_pin,
            invert_step,
            invert_dir,
            invert_enable,
            enabled: false,
            direction: Direction::Positive,
            position: 0,
            min_interval_us,
            pulse_width_us,
            last_edge_us: None,
        };
        driver.disable()?;
        let idle = driver.level(invert_step, false);
        driver.step_pin.set_state(idle)?;
        Ok(driver)
    }

    fn level(&self, invert: bool, active: bool) -> PinState {
        match (invert, active) {
            (false, false) => PinState::Low,
            (false, true) => PinState::High,
            (true, false) => PinState::High,
            (true, true) => PinState::Low,
        }
    }

    pub fn enable(&mut self) -> Result<(), E> {
        self.enabled = true;
        let state = self.level(self.invert_enable, true);
        self.enable_pin.set_state(state)
    }

    pub fn disable(&mut self) -> Result<(), E> {
        self.enabled = false;
        let state = self.level(self.invert_enable, false);
        self.enable_pin.set_state(state)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the step direction, driving the DIR pin immediately.
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), E> {
        self.direction = direction;
        let active = matches!(direction, Direction::Positive);
        let state = self.level(self.invert_dir, active);
        self.dir_pin.set_state(state)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// R1: exact round-trip with [`position`].
    pub fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    pub fn is_moving(&self) -> bool {
        self.last_edge_us.is_some()
    }

    /// Emits one step edge at `now_us`, using `spin` to busy-wait the
    /// minimum pulse width between the rising and falling edge.
    ///
    /// Updates position by the current direction's sign (+1/-1) and
    /// records `now_us` so the next call can enforce the minimum interval. Returns
    /// `StepperError::TooSoon` without toggling any pin if called
    /// sooner than `min_interval_us` after the previous edge.
    pub fn step_edge(
        &mut self,
        now_us: u32,
        mut spin: impl FnMut(u32),
    ) -> Result<(), StepperError<E>> {
        if let Some(last) = self.last_edge_us {
            if now_us.wrapping_sub(last) < self.min_interval_us {
                return Err(StepperError::TooSoon);
            }
        }
        let active = self.level(self.invert_step, true);
        let idle = self.level(self.invert_step, false);
        self.step_pin.set_state(active).map_err(StepperError::Pin)?;
        spin(self.pulse_width_us);
        self.step_pin.set_state(idle).map_err(StepperError::Pin)?;
        self.position += match self.direction {
            Direction::Positive => 1,
            Direction::Negative => -1,
        };
        self.last_edge_us = Some(now_us);
        Ok(())
    }

    /// Clears the "moving" state so the next `step_edge` is not checked
    /// against the edge recorded before the stop. Used by `stepper_stop`.
    pub fn stop(&mut self) {
        self.last_edge_us = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    fn driver(step: PinMock, dir: PinMock, en: PinMock) -> StepperDriver<PinMock, PinMock, PinMock> {
        StepperDriver::new(step, dir, en, false, false, true, 20, 2).unwrap()
    }

    #[test]
    fn new_leaves_driver_disabled() {
        let step = PinMock::new(&[Transaction::set(State::Low)]);
        let dir = PinMock::new(&[]);
        let en = PinMock::new(&[Transaction::set(State::High)]);
        let mut d = driver(step, dir, en);
        assert!(!d.is_enabled());
        d.step_pin.done();
        d.enable_pin.done();
    }

    #[test]
    fn enable_disable_toggles_with_invert() {
        let step = PinMock::new(&[Transaction::set(State::Low)]);
        let dir = PinMock::new(&[]);
        let en = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]);
        let mut d = driver(step, dir, en);
        d.enable().unwrap();
        assert!(d.is_enabled());
        d.disable().unwrap();
        assert!(!d.is_enabled());
        d.enable_pin.done();
    }

    #[test]
    fn step_edge_advances_position_and_enforces_min_interval() {
        let step = PinMock::new(&[
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let dir = PinMock::new(&[Transaction::set(State::High)]);
        let en = PinMock::new(&[Transaction::set(State::High)]);
        let mut d = driver(step, dir, en);
        d.set_direction(Direction::Positive).unwrap();
        d.step_edge(1000, |_| {}).unwrap();
        assert_eq!(d.position(), 1);
        let err = d.step_edge(1005, |_| {}).unwrap_err();
        assert_eq!(err, StepperError::TooSoon);
        d.step_pin.done();
        d.dir_pin.done();
    }

    #[test]
    fn set_position_round_trips_exactly() {
        let step = PinMock::new(&[Transaction::set(State::Low)]);
        let dir = PinMock::new(&[]);
        let en = PinMock::new(&[Transaction::set(State::High)]);
        let mut d = driver(step, dir, en);
        d.set_position(12345);
        assert_eq!(d.position(), 12345);
    }

    #[test]
    fn stop_clears_too_soon_check() {
        let step = PinMock::new(&[
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let dir = PinMock::new(&[Transaction::set(State::High)]);
        let en = PinMock::new(&[Transaction::set(State::High)]);
        let mut d = driver(step, dir, en);
        d.set_direction(Direction::Positive).unwrap();
        d.step_edge(1000, |_| {}).unwrap();
        d.stop();
        d.step_edge(1001, |_| {}).unwrap();
        assert_eq!(d.position(), 2);
        d.step_pin.done();
        d.dir_pin.done();
    }
}
