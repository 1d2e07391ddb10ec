//! Heater: ties the thermistor table, the PID loop, an input low-pass
//! filter, and thermal-runaway protection together into a single
//! "Heater" record.
//!
//! This type owns no hardware; it consumes raw ADC codes (or a sentinel
//! for a failed read) and produces a PWM duty fraction in `[0, 1]` for its
//! owner to write to a `driver-softpwm` channel.

use crate::filter::{Filter, LowPassFilter};
use crate::pid::Pid;
use crate::safety::{HeaterSafety, SafetyLimits, ThermalState};
use crate::thermistor::Table;

/// Sentinel returned by the ADC glue when a read failed (`SensorInvalid`).
pub const ADC_READ_ERROR: Option<u16> = None;

/// Per-heater state: last measured temperature, target, PID internals,
/// the input filter, the runaway monitor, and whether PWM output is
/// currently enabled.
pub struct Heater<'a> {
    table: Table<'a>,
    pid: Pid<f64>,
    filter_alpha: f64,
    filter: Option<LowPassFilter<f64>>,
    safety: HeaterSafety<f64>,
    safety_state: ThermalState,
    elapsed_s: f64,
    last_temp: f64,
    last_output: f64,
    pwm_enabled: bool,
}

impl<'a> Heater<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        table: Table<'a>,
        kp: f64,
        ki: f64,
        kd: f64,
        max_power: f64,
        integral_max: f64,
        safety_limits: SafetyLimits<f64>,
        filter_alpha: f64,
    ) -> Self {
        Self {
            table,
            pid: Pid::new(kp, ki, kd, 0.0, max_power, integral_max),
            filter_alpha,
            filter: None,
            safety: HeaterSafety::new(safety_limits),
            safety_state: ThermalState::Ok,
            elapsed_s: 0.0,
            last_temp: 0.0,
            last_output: 0.0,
            pwm_enabled: false,
        }
    }

    pub fn current_temp(&self) -> f64 {
        self.last_temp
    }

    pub fn target_temp(&self) -> f64 {
        self.pid.setpoint()
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn pwm_enabled(&self) -> bool {
        self.pwm_enabled
    }

    pub fn safety_state(&self) -> ThermalState {
        self.safety_state
    }

    /// Sets a new target. `<= 0` disables the heater's PWM and forces
    /// output to 0 (and resets the PID's internal state).
    pub fn set_target(&mut self, target: f64) {
        self.pid.set_target(target);
        if target <= 0.0 {
            self.pid.reset();
            self.pwm_enabled = false;
            self.last_output = 0.0;
        }
    }

    pub fn at_target(&self, tolerance: f64) -> bool {
        self.pid.setpoint() > 0.0 && (self.last_temp - self.pid.setpoint()).abs() <= tolerance
    }

    fn shut_down(&mut self) -> f64 {
        self.pid.reset();
        self.last_output = 0.0;
        self.pwm_enabled = false;
        0.0
    }

    /// Runs one 100ms-period PID tick. `adc_code` is `None` on a failed
    /// ADC read (`SensorInvalid`): PWM is forced to 0 for this cycle and
    /// the target is left untouched, but `last_temp` also isn't updated
    /// (there is no new sample to trust).
    ///
    /// The raw thermistor reading is passed through a low-pass filter
    /// before it is used for control or safety checks; the filter is
    /// seeded with the first real sample rather than 0.0, so there is no
    /// cold-start transient toward an implausible temperature.
    /// `HeaterSafety` runs every tick regardless of target, so a runaway
    /// or over-temperature condition forces a shutdown even if a
    /// previous tick already zeroed the output for other reasons.
    pub fn tick(&mut self, adc_code: Option<u16>, dt_s: f64) -> f64 {
        self.elapsed_s += dt_s;
        let Some(code) = adc_code else {
            return self.shut_down();
        };
        let raw_temp = self.table.lookup(code);
        let filtered = match &mut self.filter {
            Some(f) => {
                f.add_sample(raw_temp);
                f.output()
            }
            None => {
                self.filter = Some(LowPassFilter::new(self.filter_alpha, raw_temp));
                raw_temp
            }
        };
        self.last_temp = filtered;

        let setpoint = self.pid.setpoint();
        let heater_on = setpoint > 0.0 && self.pwm_enabled;
        self.safety_state = self
            .safety
            .update(self.elapsed_s, self.last_temp, setpoint, heater_on);
        if self.safety_state == ThermalState::Shutdown {
            return self.shut_down();
        }

        if setpoint <= 0.0 {
            self.last_output = 0.0;
            self.pwm_enabled = false;
            return 0.0;
        }
        let output = self.pid.update(self.last_temp, dt_s);
        self.last_output = output;
        self.pwm_enabled = output > 0.0;
        output
    }
}
