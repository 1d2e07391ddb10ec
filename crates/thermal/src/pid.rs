//! A PID (Proportional-Integral-Derivative) controller with the specific
//! anti-windup rule this firmware's heater loop depends on.
//!
//! The anti-windup rule deliberately undoes this tick's integral
//! contribution only when the output is clamped *and* the error is still
//! pushing in the clamped direction, rather than applying a fixed
//! integral-magnitude clamp. It's one of more than one defensible
//! anti-windup scheme; see DESIGN.md for why this one was kept.

use num_traits::{Float, Signed};

/// A PID controller for regulating a heater's power output.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid<F: Float + Signed> {
    /// Proportional gain.
    pub kp: F,
    /// Integral gain.
    pub ki: F,
    /// Derivative gain.
    pub kd: F,

    /// The target value for the system. Zero or below disables the
    /// controller (see [`Pid::set_target`]).
    setpoint: F,

    /// The lower bound of the controller's output (always `0` for a
    /// heater; kept as a field so the type stays generic over units).
    pub output_min: F,
    /// The upper bound of the controller's output (the heater's max power).
    pub output_max: F,
    /// Hard clamp on `|integral|`, independent of the gains.
    pub integral_max: F,

    integral: F,
    previous_error: F,
}

impl<F: Float + Signed> Pid<F> {
    /// Creates a new PID controller. The setpoint starts at zero (heater
    /// off), matching the firmware's boot state.
    pub fn new(kp: F, ki: F, kd: F, output_min: F, output_max: F, integral_max: F) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: F::zero(),
            output_min,
            output_max,
            integral_max,
            integral: F::zero(),
            previous_error: F::zero(),
        }
    }

    pub fn setpoint(&self) -> F {
        self.setpoint
    }

    /// Sets a new target temperature. A change of more than 10 (in the
    /// caller's temperature unit) resets the integrator and the previous
    /// error, so a large setpoint jump doesn't inherit a stale integral
    /// windup from the old target.
    pub fn set_target(&mut self, target: F) {
        let ten = F::from(10.0).unwrap();
        if (target - self.setpoint).abs() > ten {
            self.integral = F::zero();
            self.previous_error = F::zero();
        }
        self.setpoint = target;
    }

    /// Runs one PID tick and returns the clamped output.
    ///
    /// `dt` is the tick period (the design fixes it at 100ms, but the type
    /// stays generic over the caller's time unit as long as it's used
    /// consistently).
    pub fn update(&mut self, current_value: F, dt: F) -> F {
        if self.setpoint <= F::zero() {
            self.reset();
            return F::zero();
        }

        let error = self.setpoint - current_value;

        self.integral = self.integral + error * dt;
        self.integral = self
            .integral
            .max(-self.integral_max)
            .min(self.integral_max);

        let derivative = (error - self.previous_error) / dt;
        self.previous_error = error;

        let unclamped = self.kp * error + self.ki * self.integral + self.kd * derivative;
        let output = unclamped.max(self.output_min).min(self.output_max);

        if unclamped != output {
            let saturated_high = unclamped > self.output_max && error > F::zero();
            let saturated_low = unclamped < self.output_min && error < F::zero();
            if saturated_high || saturated_low {
                self.integral = self.integral - error * dt;
            }
        }

        output
    }

    /// Resets the internal state of the PID controller (integral and
    /// previous error), without touching the setpoint.
    pub fn reset(&mut self) {
        self.integral = F::zero();
        self.previous_error = F::zero();
    }

    pub fn integral(&self) -> F {
        self.integral
    }
}
