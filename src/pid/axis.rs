// src/pid/axis.rs

//! # Single-Axis PID Control Module
//!
//! This module provides a compute function and control data structure
//! to perform the PID (Proportional-Integral-Derivative) calculation used
//! by every stage of the cascaded controller, along with `AxisPid`, the
//! per-axis controller state that owns the gains, the accumulator, and the
//! output bounds.

use crate::Number;
use piddiy::PidController;

/// Control data for the single-axis PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisControlData<T> {
    /// The current measurement of the controlled quantity.
    pub measurement: T,
    /// The fixed tick interval of the stage.
    pub dt: T,
    /// The maximum allowed value for the integral term, used to prevent integral windup.
    pub integral_limit: T,
}

/// Single-axis PID compute callback.
///
/// Returns `(error, integral, derivative)`. The derivative is taken on the
/// error over the fixed tick interval.
pub fn compute_axis<T: Number>(
    pid: &mut PidController<T, AxisControlData<T>>,
    data: AxisControlData<T>,
) -> (T, T, T) {
    let error = pid.set_point - data.measurement;
    let integral =
        (pid.integral + error * data.dt).saturate(-data.integral_limit, data.integral_limit);
    let derivative = (error - pid.error) / data.dt;

    (error, integral, derivative)
}

/// PID state of one controlled axis.
///
/// Gains and limits are fixed at construction. The integral accumulator and
/// previous error live inside the wrapped `PidController` and are mutated on
/// every call to [`AxisPid::calculate`].
pub struct AxisPid<T: Number> {
    pid: PidController<T, AxisControlData<T>>,
    dt: T,
    integral_limit: T,
    output_limit: T,
    current: T,
}

impl<T: Number> AxisPid<T> {
    /// Creates a new axis controller.
    ///
    /// - `gains`: `(kp, ki, kd)`.
    /// - `dt`: fixed tick interval used for integration and differentiation.
    /// - `integral_limit`: symmetric bound on the integral accumulator.
    /// - `output_limit`: symmetric bound on the controller output.
    pub fn new(gains: (T, T, T), dt: T, integral_limit: T, output_limit: T) -> Self {
        let (kp, ki, kd) = gains;
        let mut pid = PidController::new();
        pid.compute_fn(compute_axis)
            .set_point(T::zero())
            .kp(kp)
            .ki(ki)
            .kd(kd);

        AxisPid {
            pid,
            dt,
            integral_limit,
            output_limit,
            current: T::zero(),
        }
    }

    /// Runs one PID evaluation for `target` against `current` and returns the
    /// output clamped to the configured bound.
    pub fn calculate(&mut self, target: T, current: T) -> T {
        self.pid.set_point(target);
        self.current = current;
        let data = AxisControlData {
            measurement: current,
            dt: self.dt,
            integral_limit: self.integral_limit,
        };
        self.pid
            .compute(data)
            .saturate(-self.output_limit, self.output_limit)
    }

    /// Clears the integral accumulator and the previous error.
    pub fn reset(&mut self) {
        self.pid.integral = T::zero();
        self.pid.error = T::zero();
        self.pid.set_point(T::zero());
        self.current = T::zero();
    }

    /// The target of the last evaluation.
    pub fn target(&self) -> T {
        self.pid.set_point
    }

    /// The measurement of the last evaluation.
    pub fn current(&self) -> T {
        self.current
    }

    /// The integral accumulator.
    pub fn integral(&self) -> T {
        self.pid.integral
    }

    /// The error of the last evaluation.
    pub fn previous_error(&self) -> T {
        self.pid.error
    }

    /// The proportional, integral and derivative gains.
    pub fn gains(&self) -> (T, T, T) {
        (self.pid.kp, self.pid.ki, self.pid.kd)
    }

    /// The symmetric output bound.
    pub fn output_limit(&self) -> T {
        self.output_limit
    }
}
