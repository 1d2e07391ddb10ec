//! Firmware core: everything that does not need a board bring-up
//! (clocks, vector table, GPIO alternate-function setup) to exercise.
//! The `main.rs` binary target is the bring-up shell; it pulls in this
//! library and the embassy/RTIC entry points that drive real hardware.
//!
//! Splitting the crate this way is what lets `cargo test` run the
//! command parser, the timer wheel, and the dispatcher on the
//! host: those modules only ever touch `core`, never a peripheral.
#![cfg_attr(not(test), no_std)]

pub mod adc;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod fixed_point;
pub mod heater;
pub mod proto_bridge;
pub mod runtime;
pub mod safety;
pub mod stepper;
pub mod time;
