//! A `no_std` software-PWM GPIO channel (mechanism, also used by
//! heater output).
//!
//! Real PWM hardware is scarce on a small Cortex-M4 pin count, and
//! heater/fan outputs don't need hardware-timer precision, so both
//! are driven by toggling a plain GPIO from a periodic timer
//! callback ("Soft-PWM"). A channel holds only the
//! duty state; `tick()` is called once per cycle-time slice by the
//! owner's timer wheel callback and decides whether the pin should be
//! high or low for that slice.

#![no_std]

use embedded_hal::digital::{OutputPin, PinState};

/// A single soft-PWM output channel.
///
/// `max_count` slices make up one full PWM cycle; `duty` (in
/// `0..=max_count`) is how many of those slices the pin is held active.
/// Zero duty disables the channel and drives the pin to its inactive
/// level, matching the fan controller's "any non-zero value enables the
/// channel (lazily)" contract.
pub struct SoftPwmChannel<PIN> {
    pin: PIN,
    invert: bool,
    max_count: u16,
    duty: u16,
    counter: u16,
    enabled: bool,
}

impl<PIN, E> SoftPwmChannel<PIN>
where
    PIN: OutputPin<Error = E>,
{
    pub fn new(pin: PIN, invert: bool, max_count: u16) -> Result<Self, E> {
        let mut channel = Self {
            pin,
            invert,
            max_count: max_count.max(1),
            duty: 0,
            counter: 0,
            enabled: false,
        };
        channel.write_level(false)?;
        Ok(channel)
    }

    fn write_level(&mut self, active: bool) -> Result<(), E> {
        let state = match (self.invert, active) {
            (false, false) => PinState::Low,
            (false, true) => PinState::High,
            (true, false) => PinState::High,
            (true, true) => PinState::Low,
        };
        self.pin.set_state(state)
    }

    /// Sets the duty as a fraction of `max_count`, clamped to `[0, 1]`.
    /// Zero disables the channel outright.
    pub fn set_fraction(&mut self, fraction: f32) -> Result<(), E> {
        let clamped = fraction.clamp(0.0, 1.0);
        let duty = (clamped * self.max_count as f32).round() as u16;
        self.set_duty(duty)
    }

    /// Sets the duty directly as a slice count in `0..=max_count`.
    pub fn set_duty(&mut self, duty: u16) -> Result<(), E> {
        self.duty = duty.min(self.max_count);
        if self.duty == 0 {
            self.enabled = false;
            self.counter = 0;
            return self.write_level(false);
        }
        self.enabled = true;
        Ok(())
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn max_count(&self) -> u16 {
        self.max_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advances the channel by one slice and drives the pin accordingly.
    /// Called once per slice period from the owner's periodic timer.
    pub fn tick(&mut self) -> Result<(), E> {
        if !self.enabled {
            return Ok(());
        }
        let active = self.counter < self.duty;
        self.write_level(active)?;
        self.counter += 1;
        if self.counter >= self.max_count {
            self.counter = 0;
        }
        Ok(())
    }
}
