//! A `no_std` ADC-channel read driver for an NTC thermistor input.
//!
//! This crate owns only the hardware side of the temperature pipeline:
//! triggering a single-shot 12-bit ADC conversion and reporting a raw
//! code (or `None` on a failed read, the `SensorInvalid` sentinel). The
//! ADC-code -> temperature conversion itself (the monotonic table with
//! linear interpolation and clamp-at-endpoint semantics)
//! is a pure numeric function with no hardware dependency
//! and lives in `thermal::thermistor::Table`, which both host tests and
//! the firmware's heater loop call directly. Keeping one copy of that
//! conversion logic, not two, avoids the two drifting apart; this crate
//! used to carry its own copy (with `None`-on-out-of-range semantics,
//! which disagreed with its clamp rule) and it has been trimmed
//! in favor of `thermal`'s version (see DESIGN.md).

#![no_std]

use embedded_hal::digital::Error as DigitalError;

/// 12-bit ADC full-scale code.
pub const ADC_MAX_CODE: u16 = 4095;

/// A single-shot ADC read that can fail (wired as a no_std-friendly
/// stand-in for `embedded_hal::adc`'s still-unstable traits, which are
/// not yet 1.0-stable across HALs as of this firmware's target toolchain).
pub trait AdcRead {
    type Error: DigitalError;

    /// Triggers a conversion and returns the raw code, clamped by the
    /// implementation to `0..=4095`.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// An NTC thermistor input channel: an ADC read that may fail, reported
/// as `None` (its `SensorInvalid` sentinel) rather than
/// propagating the hardware error, since the heater loop treats every
/// failure mode identically (force PWM to zero for the cycle).
pub struct ThermistorChannel<ADC> {
    adc: ADC,
}

impl<ADC, E> ThermistorChannel<ADC>
where
    ADC: AdcRead<Error = E>,
{
    pub fn new(adc: ADC) -> Self {
        Self { adc }
    }

    /// Reads the current raw ADC code. `None` means the read failed
    /// (`SensorInvalid`); the caller must force heater PWM to zero for
    /// this cycle without touching the configured target.
    pub fn read_code(&mut self) -> Option<u16> {
        self.adc.read_raw().ok().map(|c| c.min(ADC_MAX_CODE))
    }
}
