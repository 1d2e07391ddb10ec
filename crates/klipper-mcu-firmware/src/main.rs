#![no_std]
#![no_main]
#![feature(type_alias_impl_trait)]

use defmt_rtt as _; // global logger
use panic_probe as _;

// The bring-up-free core (command parsing, the timer wheel, config, the
// dispatcher) lives in the library target; see src/lib.rs. Only the
// board bring-up shells below are binary-only.
use klipper_mcu_firmware as _;

#[cfg(feature = "embassy-rt")]
mod embassy_main;
#[cfg(feature = "embassy-rt")]
use embassy_main as _;

#[cfg(feature = "rtic-rt")]
mod rtic_main;
#[cfg(feature = "rtic-rt")]
use rtic_main as _;
