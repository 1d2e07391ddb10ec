//! # Motion Control Crate
//!
//! A deterministic motion planner usable on both host and MCU
//! (`no_std`-friendly): the trapezoidal queue, the per-axis
//! iterative step-time solver, and the lookahead/junction-velocity
//! planner that ties them together into a toolhead.
//!
//! Cartesian-only: each stepper axis maps directly onto one of the
//! trapq's 4D position components (`position[axis] * steps_per_mm`), so
//! there is no separate kinematics transform layer.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod planner;
pub mod solver;
pub mod trapq;

pub use error::PlannerError;
pub use planner::{AxisConfig, HomingState, Toolhead, ToolheadConfig};
pub use solver::{AxisSolver, StepSink};
pub use trapq::{MoveSegment, Trapq};
