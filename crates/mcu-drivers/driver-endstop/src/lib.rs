//! A `no_std` driver for a single endstop/limit-switch input.
//!
//! Samples a digital pin at whatever rate its owner polls it (targets
//! roughly 1 kHz) and detects the not-asserted -> asserted transition.
//! Homing-mode is a latch the owner enters exactly once per homing
//! episode: while active, a fresh rising edge is reported so the owner
//! can stop the associated axis and advance its homing state machine. A
//! rising edge outside homing-mode is still latched (so the raw switch
//! state is observable) but does not stop motion.

#![no_std]

use embedded_hal::digital::InputPin;

/// Outcome of a single [`Endstop::poll`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndstopEvent {
    /// No new transition this sample.
    None,
    /// A fresh assertion was observed while homing-mode was active: the
    /// owner must stop the associated axis and run its homing callback.
    HomingTriggered,
    /// A fresh assertion was observed outside homing-mode: recorded,
    /// but motion is not affected.
    Asserted,
}

/// A single endstop switch.
pub struct Endstop<PIN> {
    pin: PIN,
    invert: bool,
    homing: bool,
    triggered_latch: bool,
    was_asserted: bool,
}

impl<PIN, E> Endstop<PIN>
where
    PIN: InputPin<Error = E>,
{
    pub fn new(pin: PIN, invert: bool) -> Self {
        Self {
            pin,
            invert,
            homing: false,
            triggered_latch: false,
            was_asserted: false,
        }
    }

    fn read_asserted(&mut self) -> Result<bool, E> {
        let high = self.pin.is_high()?;
        Ok(high != self.invert)
    }

    /// Enters homing-mode. Per the design, this happens exactly once per
    /// homing episode; the latch and edge-detector are reset so a switch
    /// already asserted before homing started does not immediately fire
    /// (the axis must actually move off/onto it).
    pub fn enter_homing(&mut self) -> Result<(), E> {
        self.homing = true;
        self.triggered_latch = false;
        self.was_asserted = self.read_asserted()?;
        Ok(())
    }

    /// Exits homing-mode, clearing the latched-triggered flag.
    pub fn exit_homing(&mut self) {
        self.homing = false;
        self.triggered_latch = false;
    }

    pub fn is_homing(&self) -> bool {
        self.homing
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered_latch
    }

    /// Samples the pin once. Detects a rising (not-asserted ->
    /// asserted) transition and reports it per the homing-mode rule.
    pub fn poll(&mut self) -> Result<EndstopEvent, E> {
        let asserted = self.read_asserted()?;
        let rising = asserted && !self.was_asserted;
        self.was_asserted = asserted;
        if !rising {
            return Ok(EndstopEvent::None);
        }
        self.triggered_latch = true;
        if self.homing {
            Ok(EndstopEvent::HomingTriggered)
        } else {
            Ok(EndstopEvent::Asserted)
        }
    }
}
