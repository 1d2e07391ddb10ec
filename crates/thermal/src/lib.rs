#![cfg_attr(not(feature = "std"), no_std)]

//! # Thermal Management Crate
//!
//! `thermal` provides a suite of tools for handling thermal systems, particularly
//! for embedded devices like 3D printers or other robotics, but is also usable
//! on host systems for simulation and testing.
//!
//! ## Features
//!
//! - **Thermistor table**: ADC-code-to-temperature conversion via a
//!   monotonic lookup table with linear interpolation and clamp-at-endpoint
//!   behaviour outside the table's range.
//! - **Signal Filtering**: Low-pass and moving average filters to reduce noise from ADC readings.
//! - **PID Controller**: A PID controller with its saturated anti-windup rule.
//! - **Heater**: combines the table, the PID loop, and the PWM-enabled flag.
//! - **Fan Controller**: clamped software-PWM duty setter with auto-disable at zero.
//! - **Heater Safety**: Logic for detecting thermal runaway and managing heater shutdowns.
//! - **`no_std` support**: Can be used in bare-metal environments.
//! - **Optional `serde` support**: For serializing/deserializing thermal components.

// Re-export the main components for easier access.
pub mod fan;
pub mod filter;
pub mod heater;
pub mod pid;
pub mod safety;
pub mod thermistor;

// Re-export key types
pub use fan::FanController;
pub use filter::{Filter, LowPassFilter, MovingAverageFilter};
pub use heater::Heater;
pub use pid::Pid;
pub use safety::{HeaterSafety, SafetyLimits, ThermalState};
pub use thermistor::{NotMonotonic, Table, TablePoint, NTC_100K_B3950};
