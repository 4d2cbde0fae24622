// src/stabilizer/cascade.rs

//! # Cascaded Angle/Rate PID Controller
//!
//! Two nested PID stages. The outer angle stage turns roll and pitch
//! setpoints, given as signed fractions of the maximum tilt, into body-rate
//! commands. The inner rate stage tracks those commands (plus a yaw-rate
//! setpoint) and produces the rate control output `(p, q, r)`.
//!
//! Each stage runs on its own cycle timer. Between executions the last
//! output of a stage is held (zero-order hold). The timer is checked before
//! it is advanced, so a stage first executes on the call after a full cycle
//! has accumulated.
//!
//! Measurements are normalized with a sign-preserving remainder by `2π`
//! before they reach a PID. Out-of-range setpoints are clamped, never
//! rejected.

use core::f64::consts::{FRAC_PI_4, PI, TAU};

use log::{debug, warn};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::physics::normalize_radian;
use crate::pid::AxisPid;
use crate::{AxisGains, Error, FlightStabilizer, FlightStabilizerConfig, Number};

/// Default maximum tilt in degrees.
pub const MAX_ANGLE_DEGREES: f64 = 20.0;

/// Converts a rotor speed in rpm to a rate in rad/s.
pub fn rpm_to_rate(rpm: f64) -> f64 {
    rpm * TAU / 60.0
}

/// Elapsed-time gate of one controller stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeTimer {
    cycle: f64,
    elapsed: f64,
}

impl CascadeTimer {
    /// A timer with period `cycle` and nothing elapsed.
    pub fn new(cycle: f64) -> Self {
        CascadeTimer {
            cycle,
            elapsed: 0.0,
        }
    }

    /// Whether a full cycle has elapsed since the last execution.
    pub fn is_due(&self) -> bool {
        self.elapsed >= self.cycle
    }

    /// Restarts the cycle.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Adds one tick to the elapsed time.
    pub fn advance(&mut self, delta_time: f64) {
        self.elapsed += delta_time;
    }

    /// Checks the gate for this call, restarting the cycle when it opens,
    /// then advances by one tick. Returns whether the stage executes.
    pub fn tick(&mut self, delta_time: f64) -> bool {
        let due = self.is_due();
        if due {
            self.reset();
        }
        self.advance(delta_time);
        due
    }

    /// Time accumulated since the last execution.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The stage period.
    pub fn cycle(&self) -> f64 {
        self.cycle
    }
}

/// Timing and saturation limits of the cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CascadeConfig {
    /// Controller tick interval in seconds.
    pub delta_time: f64,
    /// Period of the outer angle stage in seconds.
    pub angle_cycle: f64,
    /// Period of the inner rate stage in seconds.
    pub rate_cycle: f64,
    /// Tilt reached by a roll or pitch setpoint of `±1.0`.
    pub max_angle_degrees: f64,
    /// Rotor-speed bound on the rate target per axis `(roll, pitch, yaw)`.
    pub max_rotor_rpm: Vector3<f64>,
    /// Bound on the rate stage output per axis `(roll, pitch, yaw)`.
    pub max_angle_rate: Vector3<f64>,
}

impl CascadeConfig {
    /// Both stages executing on every tick, with the default limits.
    pub fn new(delta_time: f64) -> Self {
        CascadeConfig {
            delta_time,
            angle_cycle: delta_time,
            rate_cycle: delta_time,
            max_angle_degrees: MAX_ANGLE_DEGREES,
            max_rotor_rpm: Vector3::new(1.0, 1.0, 20.0),
            max_angle_rate: Vector3::new(PI / 10.0, PI / 10.0, FRAC_PI_4),
        }
    }

    /// Rejects timing or limits the cascade cannot use.
    pub fn validate(&self) -> Result<(), Error> {
        let reason = if !(self.delta_time.is_finite() && self.delta_time > 0.0) {
            Some("delta_time must be positive")
        } else if !(self.angle_cycle >= 0.0 && self.rate_cycle >= 0.0) {
            Some("stage cycles must not be negative")
        } else if !(self.max_angle_degrees >= 0.0) {
            Some("max_angle_degrees must not be negative")
        } else if self.max_rotor_rpm.iter().any(|v| !(*v >= 0.0)) {
            Some("max_rotor_rpm must not be negative")
        } else if self.max_angle_rate.iter().any(|v| !(*v >= 0.0)) {
            Some("max_angle_rate must not be negative")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!("rejected cascade configuration: {}", reason);
                Err(Error::InvalidConfig(reason))
            }
            None => Ok(()),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self::new(0.001)
    }
}

/// Target and measurement of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageInput {
    /// Desired value.
    pub target: f64,
    /// Measured value.
    pub current: f64,
}

impl StageInput {
    /// Pairs a target with a measurement.
    pub fn new(target: f64, current: f64) -> Self {
        StageInput { target, current }
    }
}

/// Output of the angle stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleStageOutput {
    /// Roll-rate command.
    pub roll_rate: f64,
    /// Pitch-rate command.
    pub pitch_rate: f64,
}

/// Output of the rate stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateStageOutput {
    /// Roll-axis output.
    pub p: f64,
    /// Pitch-axis output.
    pub q: f64,
    /// Yaw-axis output.
    pub r: f64,
}

/// Angle-over-rate cascaded PID controller.
pub struct CascadedPidController {
    angle_roll: AxisPid<f64>,
    angle_pitch: AxisPid<f64>,
    rate_roll: AxisPid<f64>,
    rate_pitch: AxisPid<f64>,
    rate_yaw: AxisPid<f64>,
    angle_timer: CascadeTimer,
    rate_timer: CascadeTimer,
    angle_output: AngleStageOutput,
    rate_output: RateStageOutput,
    config: CascadeConfig,
}

fn stage_pid(
    config: &FlightStabilizerConfig<f64>,
    gains: &AxisGains<f64>,
    delta_time: f64,
) -> AxisPid<f64> {
    AxisPid::new(
        gains.as_tuple(),
        delta_time,
        config.i_limit,
        config.output_limit,
    )
}

fn validate_stage(config: &FlightStabilizerConfig<f64>) -> Result<(), Error> {
    config.validate().map_err(|err| {
        warn!("rejected stage configuration: {:?}", config);
        err
    })
}

impl CascadedPidController {
    /// Creates a controller from the gains of both stages and the cascade
    /// timing.
    pub fn with_config(
        angle_config: FlightStabilizerConfig<f64>,
        rate_config: FlightStabilizerConfig<f64>,
        cascade_config: CascadeConfig,
    ) -> Result<Self, Error> {
        validate_stage(&angle_config)?;
        validate_stage(&rate_config)?;
        cascade_config.validate()?;
        debug!(
            "cascade controller: angle {:?}, rate {:?}, timing {:?}",
            angle_config, rate_config, cascade_config
        );

        let dt = cascade_config.delta_time;
        let a = &angle_config;
        let r = &rate_config;
        Ok(CascadedPidController {
            angle_roll: stage_pid(a, &a.roll, dt),
            angle_pitch: stage_pid(a, &a.pitch, dt),
            rate_roll: stage_pid(r, &r.roll, dt),
            rate_pitch: stage_pid(r, &r.pitch, dt),
            rate_yaw: stage_pid(r, &r.yaw, dt),
            angle_timer: CascadeTimer::new(cascade_config.angle_cycle),
            rate_timer: CascadeTimer::new(cascade_config.rate_cycle),
            angle_output: AngleStageOutput::default(),
            rate_output: RateStageOutput::default(),
            config: cascade_config,
        })
    }

    /// Outer stage. `roll` and `pitch` targets are fractions of the maximum
    /// tilt; the result is the held roll/pitch rate command.
    pub fn run_angle_stage(&mut self, roll: StageInput, pitch: StageInput) -> AngleStageOutput {
        if self.angle_timer.tick(self.config.delta_time) {
            let max_angle = self.config.max_angle_degrees.to_radians();
            self.angle_output = AngleStageOutput {
                roll_rate: self
                    .angle_roll
                    .calculate(roll.target * max_angle, normalize_radian(roll.current)),
                pitch_rate: self
                    .angle_pitch
                    .calculate(pitch.target * max_angle, normalize_radian(pitch.current)),
            };
            debug!("angle stage: {:?}", self.angle_output);
        }
        self.angle_output
    }

    /// Inner stage. Targets are body rates; the result is the held rate
    /// control output.
    pub fn run_rate_stage(
        &mut self,
        roll: StageInput,
        pitch: StageInput,
        yaw: StageInput,
    ) -> RateStageOutput {
        if self.rate_timer.tick(self.config.delta_time) {
            let rpm = self.config.max_rotor_rpm;
            let limit = self.config.max_angle_rate;
            self.rate_output = RateStageOutput {
                p: rate_axis(&mut self.rate_roll, roll, rpm.x, limit.x),
                q: rate_axis(&mut self.rate_pitch, pitch, rpm.y, limit.y),
                r: rate_axis(&mut self.rate_yaw, yaw, rpm.z, limit.z),
            };
            debug!("rate stage: {:?}", self.rate_output);
        }
        self.rate_output
    }

    /// Clears integrators, previous errors, timers and held outputs.
    pub fn reset(&mut self) {
        for pid in [
            &mut self.angle_roll,
            &mut self.angle_pitch,
            &mut self.rate_roll,
            &mut self.rate_pitch,
            &mut self.rate_yaw,
        ] {
            pid.reset();
        }
        self.angle_timer.reset();
        self.rate_timer.reset();
        self.angle_output = AngleStageOutput::default();
        self.rate_output = RateStageOutput::default();
    }

    /// Cascade timing and limits.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Last held angle stage output.
    pub fn angle_output(&self) -> AngleStageOutput {
        self.angle_output
    }

    /// Last held rate stage output.
    pub fn rate_output(&self) -> RateStageOutput {
        self.rate_output
    }
}

fn rate_axis(pid: &mut AxisPid<f64>, input: StageInput, max_rpm: f64, max_rate: f64) -> f64 {
    let max_target = rpm_to_rate(max_rpm);
    let target = input.target.saturate(-max_target, max_target);
    pid.calculate(target, normalize_radian(input.current))
        .saturate(-max_rate, max_rate)
}

impl FlightStabilizer<f64> for CascadedPidController {
    /// `set_point` is `(roll fraction, pitch fraction, yaw rate)`.
    fn control(
        &mut self,
        set_point: (f64, f64, f64),
        attitude: (f64, f64, f64),
        body_rate: (f64, f64, f64),
    ) -> (f64, f64, f64) {
        let angle = self.run_angle_stage(
            StageInput::new(set_point.0, attitude.0),
            StageInput::new(set_point.1, attitude.1),
        );
        let rate = self.run_rate_stage(
            StageInput::new(angle.roll_rate, body_rate.0),
            StageInput::new(angle.pitch_rate, body_rate.1),
            StageInput::new(set_point.2, body_rate.2),
        );
        (rate.p, rate.q, rate.r)
    }
}
